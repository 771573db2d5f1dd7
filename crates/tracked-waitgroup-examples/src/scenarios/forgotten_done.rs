use std::sync::Arc;
use std::time::Duration;

use crate::{AnyResult, Config};

pub async fn run(cfg: &Config) -> AnyResult<()> {
    let wg = Arc::new(cfg.wait_group());

    let fetch = wg.add_at("fetch.manifest", 1);
    {
        let wg = Arc::clone(&wg);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            wg.done(&fetch);
        });
    }

    let upload = wg.add(1);
    let leaked = upload.clone();
    {
        let wg = Arc::clone(&wg);
        tokio::spawn(async move {
            if let Err(err) = upload_chunk().await {
                // Early return skips done().
                println!("upload failed: {err}");
                return;
            }
            wg.done(&upload);
        });
    }

    println!("one worker forgets to call done(); expect a dump naming {leaked}");
    let release_after = cfg.timeout * 3;
    {
        let wg = Arc::clone(&wg);
        tokio::spawn(async move {
            tokio::time::sleep(release_after).await;
            println!("releasing the leaked unit so the example can exit");
            wg.done(&leaked);
        });
    }

    wg.wait(cfg.timeout).await;
    println!("wait returned");
    Ok(())
}

async fn upload_chunk() -> AnyResult<()> {
    tokio::time::sleep(Duration::from_millis(10)).await;
    Err("connection reset by peer".to_owned())
}
