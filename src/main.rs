use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use dspace_load::{
    Executor, LogSink, OutcomeRecorder, RateExecutor, Scenario,
    config::Config,
    logging, selector,
    transport::{ReqwestTransport, Session},
    workflow::Runner,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Any failure before the first request aborts the whole run.
    let sink = Arc::new(LogSink::open(&config.log_file, config.log_level)?);
    logging::init(sink.clone())?;
    let active = selector::resolve(&config.tasks)?;
    let transport = ReqwestTransport::new(config.request_timeout())?;

    tracing::info!(
        url = %config.url,
        tasks = ?active.iter().collect::<Vec<_>>(),
        users = config.users(),
        "Starting load test"
    );

    let recorder = Arc::new(OutcomeRecorder::new(sink));
    let session = Session::new(transport, recorder, &config.url);
    let runner = Runner::new(session, active);

    // One runner, one connection pool, shared by every user.
    let scenario = Scenario::builder()
        .name(config.tasks.clone())
        .action(move || {
            let runner = runner.clone();
            async move { runner.run_once().await }
        })
        .build();

    let tally = RateExecutor::builder()
        .stages(config.stages())
        .users(config.users())
        .build()
        .exec(&scenario)
        .await
        .context("load test run failed")?;

    println!("{}", serde_json::to_string_pretty(&tally)?);
    Ok(())
}
