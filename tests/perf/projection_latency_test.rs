use std::time::Instant;

use nugetfind_core::model::RawPackageRecord;
use nugetfind_core::page::{Page, PageProfile};
use nugetfind_core::projector::project_all;

fn p95_ms(samples: &mut [f64]) -> f64 {
    samples.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let last = samples.len().saturating_sub(1);
    let idx = ((last as f64) * 0.95).round() as usize;
    samples[idx.min(last)]
}

#[test]
fn full_page_projection_p95_under_2ms() {
    let records: Vec<RawPackageRecord> = (0..20)
        .map(|i| {
            let id = format!("Contoso.Package{i:02}");
            let icon = format!("https://api.nuget.org/v3-flatcontainer/{id}/1.0.{i}/icon");
            RawPackageRecord::new(Some(&id), Some(&format!("1.0.{i}")), Some(&icon))
        })
        .collect();
    let profile = PageProfile::from(Page::Packages);

    for _ in 0..30 {
        let _ = project_all(&records, &profile);
    }

    let mut batch_p95 = Vec::with_capacity(5);
    for _ in 0..5 {
        let mut samples = Vec::with_capacity(80);
        for _ in 0..80 {
            let start = Instant::now();
            let items = project_all(&records, &profile);
            samples.push(start.elapsed().as_secs_f64() * 1000.0);
            assert_eq!(items.len(), 20);
        }
        batch_p95.push(p95_ms(&mut samples));
    }

    batch_p95.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let median_p95 = batch_p95[batch_p95.len() / 2];

    assert!(
        median_p95 <= 2.0,
        "median batch p95 too high: {median_p95:.3}ms (budget 2.0ms); batches={batch_p95:?}",
    );
}
