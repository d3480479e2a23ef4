use ip_lookup::clock::RowClocks;
use ip_lookup::config::{load_config, Config};
use ip_lookup::gateway::HttpGateway;
use ip_lookup::rows::RowCollection;
use ip_lookup::tick::TickScheduler;
use ip_lookup::validation::is_valid_ip;
use ip_lookup::view::{CollectionView, DESCRIPTION};

use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Notify;

async fn read_stdin_ips() -> anyhow::Result<Vec<String>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ips = vec![];
    while let Some(line) = lines.next_line().await? {
        if !line.trim().is_empty() {
            ips.push(line);
        }
    }
    Ok(ips)
}

async fn async_main(config: Config, mut ips: Vec<String>) -> anyhow::Result<()> {
    simple_logger::init_with_level(config.log_level)?;

    if ips.is_empty() {
        ips = read_stdin_ips().await?;
    }

    let api_base = config.api_base_url()?;
    log::info!(r#"Looking up {} address(es) at "{api_base}""#, ips.len());
    let collection = Arc::new(RowCollection::empty(HttpGateway::new(api_base)));
    for ip in ips {
        let id = collection.add_row();
        collection.update_row_ip(id, ip);
    }

    let lookups: Vec<_> = collection
        .row_ids()
        .into_iter()
        .map(|id| {
            let collection = Arc::clone(&collection);
            tokio::spawn(async move { collection.lookup_row(id).await })
        })
        .collect();
    for lookup in lookups {
        lookup.await?;
    }

    let scheduler = TickScheduler::new(config.tick_interval());
    let mut clocks = RowClocks::new(scheduler.clone());
    let rows = collection.rows();
    clocks.sync(&rows);
    println!("{DESCRIPTION}");
    print!("{}", CollectionView::of(&rows, None, |id| clocks.time(id)));

    if !config.watch {
        return Ok(());
    }

    let tick = Arc::new(Notify::new());
    let _subscription = {
        let tick = Arc::clone(&tick);
        scheduler.subscribe(move || tick.notify_one())
    };
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = tick.notified() => {
                print!("{}", CollectionView::of(&rows, None, |id| clocks.time(id)));
            }
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    // Usage: ip-lookup [CONFIG] [IP...]
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let has_config = args
        .first()
        .map_or(false, |first| !is_valid_ip(first.trim()));
    let config_path = has_config.then(|| PathBuf::from(args.remove(0)));
    let ips = args;

    let config = load_config(config_path.as_deref())?;

    #[cfg(feature = "multi-thread")]
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    #[cfg(not(feature = "multi-thread"))]
    let mut runtime_builder = tokio::runtime::Builder::new_current_thread();
    let runtime = runtime_builder.enable_all().build()?;

    runtime.block_on(async_main(config, ips))
}
