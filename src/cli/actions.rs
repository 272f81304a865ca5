use anyhow::{anyhow, Result};
use clap::ArgMatches;
use std::time::{Duration, Instant};

use super::config::LinkBootConfig;
use crate::core::{BoardKind, LinkTiming, Session, SessionSnapshot};
use crate::protocol::transport::{SerialConfig, SerialTransport, SimulatedBoard, Transport};

/// Interval between printed snapshots while polling.
const SNAPSHOT_INTERVAL: Duration = Duration::from_secs(1);

/// Connection settings resolved from the command line or a config file.
#[derive(Debug, Clone)]
pub struct LinkTarget {
    /// `None` selects the simulated board.
    pub port_name: Option<String>,
    pub baud_rate: u32,
    pub board: BoardKind,
    pub timing: LinkTiming,
    /// Serial delay overrides; `None` keeps the transport defaults.
    pub post_write_delay: Option<Duration>,
    pub settle_delay: Option<Duration>,
}

impl LinkTarget {
    pub fn from_matches(matches: &ArgMatches) -> Result<Self> {
        if let Some(path) = matches.get_one::<String>("config") {
            let config = LinkBootConfig::from_file(path)?;
            let simulate = matches.get_flag("simulate");
            return Ok(Self {
                port_name: (!simulate).then(|| config.port_name.clone()),
                baud_rate: config.baud_rate,
                board: config.board,
                timing: config.link_timing(),
                post_write_delay: config.timing.post_write_delay(),
                settle_delay: config.timing.settle_delay(),
            });
        }

        let board_name = matches
            .get_one::<String>("board")
            .map(String::as_str)
            .unwrap_or("ac");
        let board: BoardKind = board_name.parse().map_err(|err| {
            anyhow!("Unknown board '{board_name}' ({err}), expected 'ac' or 'curtain'")
        })?;
        let port_name = if matches.get_flag("simulate") {
            None
        } else {
            let port = matches
                .get_one::<String>("port")
                .ok_or_else(|| anyhow!("--port is required unless --simulate or --config is given"))?;
            Some(port.clone())
        };
        Ok(Self {
            port_name,
            baud_rate: matches.get_one::<u32>("baud-rate").copied().unwrap_or(9600),
            board,
            timing: LinkTiming::default(),
            post_write_delay: None,
            settle_delay: None,
        })
    }

    fn serial_transport(&self, port: &str) -> SerialTransport {
        let mut transport = SerialTransport::new(port, SerialConfig::with_baud(self.baud_rate));
        if let Some(delay) = self.post_write_delay {
            transport = transport.with_post_write_delay(delay);
        }
        if let Some(delay) = self.settle_delay {
            transport = transport.with_settle_delay(delay);
        }
        transport
    }

    pub fn open_session(&self) -> Result<Session<Box<dyn Transport>>> {
        let transport: Box<dyn Transport> = match &self.port_name {
            Some(port) => Box::new(self.serial_transport(port)),
            None => {
                log::info!("Using simulated {} board", self.board);
                Box::new(SimulatedBoard::with_sample_readings(self.board))
            }
        };
        let mut session = Session::new(self.board, transport, self.timing.clone());
        session.connect()?;
        Ok(session)
    }
}

/// Run whatever the command line asked for.
pub fn run(matches: &ArgMatches) -> Result<()> {
    let want_json = matches.get_flag("json");

    if matches.get_flag("list-ports") {
        list_ports(want_json);
        return Ok(());
    }

    let target = LinkTarget::from_matches(matches)?;
    let mut session = target.open_session()?;

    let result = if let Some(value) = matches.get_one::<f64>("set").copied() {
        set_value(&mut session, value, want_json)
    } else if matches.get_flag("poll") {
        match matches.get_one::<f64>("duration").copied().map(poll_duration) {
            Some(Err(err)) => Err(err),
            Some(Ok(duration)) => poll(&mut session, Some(duration), want_json),
            None => poll(&mut session, None, want_json),
        }
    } else {
        session.refresh();
        print_snapshot(&session.snapshot(), want_json);
        Ok(())
    };

    session.disconnect();
    result
}

fn poll_duration(secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs.max(0.0))
        .map_err(|err| anyhow!("Invalid --duration {secs}: {err}"))
}

fn list_ports(want_json: bool) {
    let ports = crate::utils::enumerate_ports();
    if want_json {
        match serde_json::to_string_pretty(&ports) {
            Ok(s) => println!("{s}"),
            Err(err) => log::warn!("Failed to serialize port list: {err}"),
        }
    } else {
        for port in ports {
            println!("{} ({})", port.port_name, port.port_type);
        }
    }
}

fn set_value<T: Transport>(session: &mut Session<T>, value: f64, want_json: bool) -> Result<()> {
    let channel = session.profile().setpoint.channel;
    let outcome = session.write_setpoint(value);
    if want_json {
        #[derive(serde::Serialize)]
        struct SetResult {
            channel: crate::core::Channel,
            requested: f64,
            accepted: Option<f64>,
            error: Option<String>,
        }
        let result = SetResult {
            channel,
            requested: value,
            accepted: outcome.as_ref().ok().copied(),
            error: outcome.as_ref().err().map(ToString::to_string),
        };
        if let Ok(s) = serde_json::to_string(&result) {
            println!("{s}");
        }
    } else if let Ok(accepted) = outcome {
        println!("{channel} = {accepted}");
    }
    outcome
        .map(|_| ())
        .map_err(|err| anyhow!("Failed to set {channel} to {value}: {err}"))
}

/// Tick the poller on its cadence until interrupted or `duration` elapses.
fn poll<T: Transport>(
    session: &mut Session<T>,
    duration: Option<Duration>,
    want_json: bool,
) -> Result<()> {
    let (stop_tx, stop_rx) = flume::bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = stop_tx.try_send(());
    })
    .map_err(|err| anyhow!("Failed to install Ctrl+C handler: {err}"))?;

    let started = Instant::now();
    let mut last_print = started;
    let interval = session.timing().poll_interval;
    let (mut responses, mut timeouts) = (0usize, 0usize);

    loop {
        let outcome = session.poll_tick();
        if outcome.is_disconnected() {
            return Err(anyhow!("{} board disconnected", session.board()));
        }
        responses += usize::from(outcome.response.is_some());
        timeouts += usize::from(outcome.timed_out.is_some());

        if last_print.elapsed() >= SNAPSHOT_INTERVAL {
            print_snapshot(&session.snapshot(), want_json);
            last_print = Instant::now();
        }
        if duration.is_some_and(|limit| started.elapsed() >= limit) {
            break;
        }
        match stop_rx.recv_timeout(interval) {
            Ok(()) | Err(flume::RecvTimeoutError::Disconnected) => {
                log::info!("Poll loop interrupted");
                break;
            }
            Err(flume::RecvTimeoutError::Timeout) => {}
        }
    }

    log::info!("Polling stopped: {responses} response(s), {timeouts} timeout(s)");
    print_snapshot(&session.snapshot(), want_json);
    Ok(())
}

fn print_snapshot(snapshot: &SessionSnapshot, want_json: bool) {
    if want_json {
        match serde_json::to_string(snapshot) {
            Ok(s) => println!("{s}"),
            Err(err) => log::warn!("Failed to serialize snapshot: {err}"),
        }
        return;
    }

    println!(
        "[{}] {} ({})",
        snapshot.captured_at.format("%H:%M:%S%.3f"),
        snapshot.board,
        if snapshot.connected { "connected" } else { "disconnected" }
    );
    for channel in &snapshot.channels {
        let raw = match (channel.high, channel.low) {
            (Some(high), Some(low)) => format!("{high}/{low}"),
            (Some(byte), None) => format!("{byte}"),
            _ => "-".to_string(),
        };
        println!("  {:<20} {:>9.2}  raw {raw}", channel.channel.to_string(), channel.value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::build_command;

    fn target(args: &[&str]) -> Result<LinkTarget> {
        let matches = build_command().try_get_matches_from(args).unwrap();
        LinkTarget::from_matches(&matches)
    }

    #[test]
    fn simulate_needs_no_port() {
        let target = target(&["homelink", "--simulate", "--board", "curtain"]).unwrap();
        assert_eq!(target.port_name, None);
        assert_eq!(target.board, BoardKind::Curtain);
    }

    #[test]
    fn missing_port_is_an_error() {
        assert!(target(&["homelink", "--board", "ac"]).is_err());
        assert!(target(&["homelink", "--simulate", "--board", "garage"]).is_err());
    }

    #[test]
    fn config_delays_reach_the_serial_transport() {
        let path = std::env::temp_dir().join(format!("homelink_delays_{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"{"port_name": "/dev/ttyS3", "board": "ac", "timing": {"post_write_delay_ms": 0}}"#,
        )
        .unwrap();
        let path_arg = path.to_string_lossy().into_owned();
        let target = target(&["homelink", "--config", &path_arg]);
        std::fs::remove_file(&path).unwrap();
        let target = target.unwrap();

        let transport = target.serial_transport("/dev/ttyS3");
        assert_eq!(transport.post_write_delay(), Duration::ZERO);
        assert_eq!(
            transport.settle_delay(),
            crate::protocol::transport::serial::DEFAULT_SETTLE_DELAY
        );
        assert_eq!(transport.config().baud, 9600);
    }

    #[test]
    fn unrepresentable_duration_is_an_error() {
        assert_eq!(poll_duration(1.5).unwrap(), Duration::from_millis(1500));
        assert_eq!(poll_duration(-3.0).unwrap(), Duration::ZERO);
        assert!(poll_duration(f64::INFINITY).is_err());
        assert!(poll_duration(1e300).is_err());
    }

    #[test]
    fn simulated_set_reaches_the_board() {
        let target = target(&["homelink", "--simulate", "--board", "ac"]).unwrap();
        let mut session = target.open_session().unwrap();
        set_value(&mut session, 21.5, false).unwrap();
        assert_eq!(
            session.peek(crate::core::Channel::DesiredTemperature),
            Some(21.5)
        );
    }
}
