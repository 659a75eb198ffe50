//! Benchmark: composition and provisioning of layered applications

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use wiring::{
    instance, AggregationRegistry, ApplicationComposer, ApplicationInstanceBuilder, Application,
    ArgCheck, Class, Element, FactoryInjector, InstanceOptions, Strategy, TypeSpec,
};

/// `layers` modules in an import chain; every element of a layer needs the
/// previous layer's export, and the last layer aggregates every plugin
fn layered_app(layers: usize, width: usize) -> (Application, AggregationRegistry) {
    let plugin = Class::new("Plugin");
    let mut app = Application::new();
    let mut registry = AggregationRegistry::new();
    let mut previous: Option<(wiring::ModuleId, Class)> = None;

    for layer in 0..layers {
        let module = app.add_named_module(format!("layer{}", layer));
        let layer_type = Class::with_bases(format!("Layer{}", layer), [plugin.clone()]);

        for idx in 0..width {
            let mut injector =
                FactoryInjector::new(|_| Ok(instance(()))).returns(TypeSpec::from(&layer_type));
            if let Some((_, below)) = &previous {
                injector = injector.requires("below", TypeSpec::from(below));
            }
            let label = format!("l{}e{}", layer, idx);
            let element =
                app.add_element(Element::new(injector, Strategy::Singleton).with_label(label));
            let Some(owner) = app.module_mut(module) else {
                continue;
            };
            owner.add_element(element);
            // One export per layer keeps direct assignment unambiguous
            if idx == 0 {
                owner.add_export(element).add_bootstrap(element);
            }
        }

        if let Some((below, _)) = previous {
            app.import(module, below, false);
        }
        previous = Some((module, layer_type));
    }

    let sink = app.add_named_module("sink");
    let collector = app.add_element(Element::new(
        FactoryInjector::new(|_| Ok(instance(()))).requires(
            "plugins",
            wiring::builtins().list.of([TypeSpec::from(&plugin)]),
        ),
        Strategy::Singleton,
    ));
    if let Some(module) = app.module_mut(sink) {
        module.add_element(collector).add_bootstrap(collector);
    }
    for layer in 0..layers {
        if let Some(module) = app.modules().nth(layer).map(|m| m.id()) {
            app.import(sink, module, false);
        }
    }
    registry.include_global(ArgCheck("plugins".to_string()));
    (app, registry)
}

fn benchmark_compose(c: &mut Criterion) {
    let mut group = c.benchmark_group("compose");
    for layers in [4usize, 16, 64] {
        let (app, registry) = layered_app(layers, 8);
        let composer = ApplicationComposer::new(Arc::new(registry.build_selector(&app)));
        group.bench_with_input(BenchmarkId::from_parameter(layers), &app, |b, app| {
            b.iter(|| black_box(composer.compose(app).unwrap()));
        });
    }
    group.finish();
}

fn benchmark_boot(c: &mut Criterion) {
    let (app, registry) = layered_app(32, 8);
    let composed = ApplicationComposer::new(Arc::new(registry.build_selector(&app)))
        .compose(&app)
        .unwrap();

    c.bench_function("boot_sequential", |b| {
        b.iter(|| black_box(ApplicationInstanceBuilder::new(&composed).build().unwrap()));
    });

    c.bench_function("boot_parallel", |b| {
        b.iter(|| {
            black_box(
                ApplicationInstanceBuilder::new(&composed)
                    .with_options(InstanceOptions {
                        boot: true,
                        parallel: true,
                    })
                    .build()
                    .unwrap(),
            )
        });
    });
}

criterion_group!(benches, benchmark_compose, benchmark_boot);
criterion_main!(benches);
