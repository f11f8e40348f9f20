//! 证书渲染与 Blob 上传基准测试

use std::sync::Arc;

use bytes::Bytes;
use chrono::{TimeZone, Utc};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use learnhub::services::certificate::{
    BlobStore, CertificateDocument, MemoryBlobStore, blob_key_for, generate_certificate_id,
    render_certificate,
};

fn document(title_len: usize) -> CertificateDocument {
    let issued_at = Utc.with_ymd_and_hms(2026, 10, 1, 12, 0, 0).unwrap();
    let certificate_id = generate_certificate_id(issued_at);
    CertificateDocument {
        verification_url: format!("https://learnhub.example.com/verify/{}", certificate_id),
        certificate_id,
        student_name: "Grace Hopper".to_string(),
        course_title: "Compilers ".repeat(title_len / 10 + 1),
        instructor_name: "Ada Lovelace".to_string(),
        issuer_name: "LearnHub".to_string(),
        issued_at,
    }
}

fn bench_render_certificate(c: &mut Criterion) {
    let mut group = c.benchmark_group("certificate/render");

    for title_len in [20, 80, 200] {
        let doc = document(title_len);
        group.bench_with_input(BenchmarkId::new("title_len", title_len), &doc, |b, doc| {
            b.iter(|| {
                let pdf = render_certificate(doc).expect("render should succeed");
                assert!(pdf.starts_with(b"%PDF"));
            });
        });
    }

    group.finish();
}

fn bench_certificate_id(c: &mut Criterion) {
    let at = Utc::now();
    c.bench_function("certificate/generate_id", |b| {
        b.iter(|| {
            let id = generate_certificate_id(at);
            blob_key_for(&id)
        });
    });
}

// 渲染 + 上传（内存存储）
fn bench_render_and_store(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
    let doc = document(40);

    c.bench_function("certificate/render_and_store", |b| {
        b.to_async(&rt).iter(|| {
            let store = store.clone();
            let doc = doc.clone();
            async move {
                let pdf = render_certificate(&doc).expect("render should succeed");
                let key = blob_key_for(&generate_certificate_id(doc.issued_at));
                store
                    .put(&key, Bytes::from(pdf), "application/pdf")
                    .await
                    .expect("put should succeed");
            }
        });
    });
}

criterion_group!(
    benches,
    bench_render_certificate,
    bench_certificate_id,
    bench_render_and_store,
);
criterion_main!(benches);
