use base64::{engine::general_purpose::STANDARD, Engine as _};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;
use tokio::runtime::Runtime;
use vitrine::{Flow, FlowContext, FlowControl, FlowError, FlowRegistry, SkipCondition, UploadPolicy, UploadSource};

#[derive(Clone, Debug, Default)]
struct BenchContext {
  counter: u64,
}

fn build_flow(num_steps: usize) -> Flow<BenchContext, FlowError> {
  let names: Vec<String> = (0..num_steps).map(|i| format!("step_{i}")).collect();
  let step_defs: Vec<(&str, bool, Option<SkipCondition<BenchContext>>)> =
    names.iter().map(|n| (n.as_str(), false, None)).collect();

  let mut flow = Flow::<BenchContext, FlowError>::new(&step_defs);
  for name in &names {
    flow.on(name, |ctx: FlowContext<BenchContext>| async move {
      ctx.write().counter += 1;
      Ok::<_, FlowError>(FlowControl::Continue)
    });
  }
  flow
}

fn bench_flow_run(c: &mut Criterion) {
  let mut group = c.benchmark_group("FlowRun");
  let rt = Runtime::new().unwrap();

  for num_steps in [1usize, 5, 20] {
    let flow = Arc::new(build_flow(num_steps));
    group.throughput(Throughput::Elements(num_steps as u64));
    group.bench_with_input(BenchmarkId::from_parameter(num_steps), &num_steps, |b, _| {
      b.to_async(&rt).iter_batched(
        || FlowContext::new(BenchContext::default()),
        |ctx| {
          let flow = flow.clone();
          async move { flow.run(ctx).await.unwrap() }
        },
        criterion::BatchSize::SmallInput,
      );
    });
  }
  group.finish();
}

fn bench_registry_dispatch(c: &mut Criterion) {
  let rt = Runtime::new().unwrap();
  let registry = Arc::new(FlowRegistry::<FlowError>::new());
  registry.register(build_flow(3));

  c.bench_function("FlowRegistry::run/3steps", |b| {
    b.to_async(&rt).iter_batched(
      || FlowContext::new(BenchContext::default()),
      |ctx| {
        let registry = registry.clone();
        async move { registry.run(ctx).await.unwrap() }
      },
      criterion::BatchSize::SmallInput,
    );
  });
}

fn bench_upload_validation(c: &mut Criterion) {
  let mut group = c.benchmark_group("UploadValidate");
  let policy = UploadPolicy::default();

  for size_kib in [16usize, 256, 2048] {
    let mut bytes = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.resize(size_kib * 1024, 0xAB);
    let encoded = STANDARD.encode(&bytes);

    group.throughput(Throughput::Bytes(bytes.len() as u64));
    group.bench_with_input(BenchmarkId::new("multipart", size_kib), &bytes, |b, bytes| {
      b.iter(|| {
        policy
          .validate(UploadSource::Multipart {
            file_name: Some("photo.png".to_string()),
            declared_mime: Some("image/png".to_string()),
            bytes: bytes.clone(),
          })
          .unwrap()
      });
    });
    group.bench_with_input(BenchmarkId::new("base64", size_kib), &encoded, |b, encoded| {
      b.iter(|| {
        policy
          .validate(UploadSource::Base64 {
            file_name: "photo.png".to_string(),
            file_data: encoded.clone(),
          })
          .unwrap()
      });
    });
  }
  group.finish();
}

criterion_group!(benches, bench_flow_run, bench_registry_dispatch, bench_upload_validation);
criterion_main!(benches);
