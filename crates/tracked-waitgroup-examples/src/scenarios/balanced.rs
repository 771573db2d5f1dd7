use std::sync::Arc;
use std::time::Duration;

use crate::{AnyResult, Config};

const WORKERS: usize = 32;

pub async fn run(cfg: &Config) -> AnyResult<()> {
    let wg = Arc::new(cfg.wait_group());

    let site = wg.add(WORKERS);
    for i in 0..WORKERS {
        let wg = Arc::clone(&wg);
        let site = site.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis((i % 8) as u64 * 5)).await;
            wg.done(&site);
        });
    }

    println!("{WORKERS} workers registered at {site}; all of them finish well inside the bound");
    wg.wait(cfg.timeout).await;
    println!("wait returned with nothing outstanding and no dump");
    Ok(())
}
