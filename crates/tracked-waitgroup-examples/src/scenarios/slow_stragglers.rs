use std::sync::Arc;
use std::time::Duration;

use crate::{AnyResult, Config};

const STAGES: [(&str, usize, u64); 3] = [
    ("stage.decode", 4, 1),
    ("stage.resize", 3, 2),
    ("stage.encode", 2, 4),
];

pub async fn run(cfg: &Config) -> AnyResult<()> {
    let wg = Arc::new(cfg.wait_group());

    for (label, workers, slowness) in STAGES {
        let site = wg.add_at(label, workers);
        for i in 0..workers {
            let wg = Arc::clone(&wg);
            let site = site.clone();
            let delay = cfg.timeout.mul_f64(0.5 * slowness as f64)
                + Duration::from_millis(i as u64 * 50);
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                wg.done(&site);
            });
        }
    }

    println!(
        "{} units across {} stages; later stages finish after the bound",
        wg.pending(),
        STAGES.len()
    );
    println!("pass --redump-ms to watch the outstanding set shrink");
    wg.wait(cfg.timeout).await;

    let snapshot = wg.snapshot();
    println!("final snapshot: {}", snapshot.to_json()?);
    Ok(())
}
