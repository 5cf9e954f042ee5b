pub mod cli;

use std::net::SocketAddr;
use std::process::ExitCode;

use backend::config::{ConfigError, RecorderConfig};
use backend::device::{DeviceSession, SessionOptions, SimulatedBoard};
use backend::error::AppError;
use backend::preview::preview_table;
use backend::readout::{ReadoutState, serve};
use backend::recorder::Recorder;
use backend::runner::{
    PollController, PollSettings, RelaySettings, SamplerSettings, StopHandle, StopSignal,
    SummarySettings, SystemClock, run_relay as relay_loop, run_summary, stop_pair,
};
use backend::sink::{CsvSink, SinkMode};
use backend::source::CoinGeckoSource;
use clap::Parser;
use common::logger::{TraceId, child_span, root_span};
use common::{LogFormat, init_logger};
use tokio::task::JoinHandle;
use tracing::{Instrument, error, info, warn};

use cli::{Cli, Mode, PriceArgs, RelayArgs, SummarizeArgs};

const PREVIEW_ROWS: usize = 5;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger("velocity", LogFormat::from_env());

    let trace_id = TraceId::new();
    let span = root_span(cli.mode.name(), &trace_id);

    match run(cli).instrument(span).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, exit_code = e.exit_code(), "velocity terminated");
            eprintln!("velocity: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let cfg = RecorderConfig::from_env()?;

    match cli.mode {
        Mode::Price(args) => run_price(cfg, args).await,
        Mode::Relay(args) => run_relay(cfg, args).await,
        Mode::Summarize(args) => run_summarize(cfg, args).await,
    }
}

async fn run_price(mut cfg: RecorderConfig, args: PriceArgs) -> Result<(), AppError> {
    if let Some(output) = args.output {
        cfg.price_output = output;
    }
    if let Some(url) = args.url {
        cfg.coingecko_url = url;
    }
    if let Some(coin) = args.coin {
        cfg.coin_id = coin;
    }
    if let Some(currency) = args.currency {
        cfg.vs_currency = currency;
    }
    if let Some(secs) = args.backoff_secs {
        cfg.backoff = std::time::Duration::from_secs(secs);
    }
    if let Some(retention) = args.retention {
        cfg.retention = retention;
    }

    let (stop, signal) = stop_pair();
    stop_on_ctrl_c(vec![stop.clone()]);

    let readout = ReadoutState::new(stop.clone());
    let sink = CsvSink::open(&cfg.price_output, SinkMode::Append, cfg.zone, cfg.first_row)?;
    let recorder =
        Recorder::new(cfg.retention, readout.clone(), cfg.zone).with_sink(Box::new(sink));
    let source = CoinGeckoSource::new(
        cfg.coingecko_url.clone(),
        cfg.coin_id.clone(),
        cfg.vs_currency.clone(),
    )?;

    let server = match args.http_port {
        Some(port) => Some(spawn_readout(
            socket_addr(&cfg.bind, port)?,
            readout.clone(),
            stop.signal(),
        )),
        None => None,
    };

    info!(
        output = %cfg.price_output.display(),
        coin = %cfg.coin_id,
        currency = %cfg.vs_currency,
        "price recorder starting"
    );

    let controller = PollController::new(source, SystemClock, recorder, readout, poll_settings(&cfg));
    let recorder = controller.run(signal).instrument(child_span("poll")).await?;
    info!(accepted = recorder.accepted(), "price recorder stopped");

    if let Some(server) = server {
        join_server(server).await?;
    }
    Ok(())
}

/// `POST /api/stop` ends acquisition only; the readout keeps serving until ctrl-c.
async fn run_relay(mut cfg: RecorderConfig, args: RelayArgs) -> Result<(), AppError> {
    if let Some(bind) = args.bind {
        cfg.bind = bind;
    }
    if let Some(port) = args.port {
        cfg.port = port;
    }
    if let Some(ms) = args.sample_ms {
        cfg.sample_every = std::time::Duration::from_millis(ms);
    }
    let addr = socket_addr(&cfg.bind, cfg.port)?;

    let (acquisition, _) = stop_pair();
    let (shutdown, shutdown_signal) = stop_pair();
    stop_on_ctrl_c(vec![acquisition.clone(), shutdown.clone()]);

    let readout = ReadoutState::new(acquisition.clone());

    let session = DeviceSession::open(SimulatedBoard::muse(), &session_options(&cfg))?;

    let mut recorder = Recorder::new(cfg.retention, readout.clone(), cfg.zone);
    if let Some(output) = &args.output {
        let sink = CsvSink::open(output, SinkMode::Append, cfg.zone, cfg.first_row)?;
        recorder = recorder.with_sink(Box::new(sink));
    }

    let server = spawn_readout(addr, readout.clone(), shutdown_signal);

    let settings = RelaySettings {
        sampler: SamplerSettings {
            every: cfg.sample_every,
            ..Default::default()
        },
        poll: poll_settings(&cfg),
        ..Default::default()
    };
    if let Err(e) = relay_loop(session, SystemClock, recorder, readout, settings, acquisition).await {
        shutdown.trigger();
        if let Err(server_err) = join_server(server).await {
            warn!(error = %server_err, "readout stopped with an error");
        }
        return Err(e);
    }

    join_server(server).await
}

async fn run_summarize(cfg: RecorderConfig, args: SummarizeArgs) -> Result<(), AppError> {
    let output = args.output.unwrap_or_else(|| cfg.summary_output.clone());

    let (stop, signal) = stop_pair();
    stop_on_ctrl_c(vec![stop.clone()]);
    let readout = ReadoutState::new(stop);

    let session = DeviceSession::open(SimulatedBoard::muse(), &session_options(&cfg))?;
    let sink = CsvSink::open(&output, SinkMode::Truncate, cfg.zone, cfg.first_row)?;
    let recorder = Recorder::new(cfg.retention, readout.clone(), cfg.zone)
        .with_sink(Box::new(sink))
        .with_echo(false);

    let settings = SummarySettings {
        minutes: args.minutes,
        empty_window: cfg.empty_window,
        preview_rows: PREVIEW_ROWS,
        ..Default::default()
    };
    info!(minutes = args.minutes, output = %output.display(), "summary run starting");

    let report = run_summary(session, SystemClock, recorder, readout, settings, signal)
        .instrument(child_span("summary"))
        .await?;

    println!("CSV generated: {} ({} minutes)", output.display(), report.total);
    println!();
    println!("--- Preview ---");
    print!("{}", preview_table(&report.head, cfg.zone, PREVIEW_ROWS));
    Ok(())
}

fn poll_settings(cfg: &RecorderConfig) -> PollSettings {
    PollSettings {
        backoff: cfg.backoff,
        slow_fetch: cfg.slow_fetch,
    }
}

fn session_options(cfg: &RecorderConfig) -> SessionOptions {
    SessionOptions {
        config_command: cfg.board_config.clone(),
        ..Default::default()
    }
}

fn socket_addr(bind: &str, port: u16) -> Result<SocketAddr, ConfigError> {
    format!("{bind}:{port}")
        .parse()
        .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
            name: "VELOCITY_BIND",
            reason: format!("{bind}:{port}: {e}"),
        })
}

fn stop_on_ctrl_c(handles: Vec<StopHandle>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received, stopping");
            for handle in &handles {
                handle.trigger();
            }
        }
    });
}

fn spawn_readout(
    addr: SocketAddr,
    readout: ReadoutState,
    mut shutdown: StopSignal,
) -> JoinHandle<std::io::Result<()>> {
    tokio::spawn(serve(addr, readout, async move { shutdown.stopped().await }))
}

async fn join_server(server: JoinHandle<std::io::Result<()>>) -> Result<(), AppError> {
    server.await?.map_err(AppError::Server)
}
