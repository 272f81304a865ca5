pub mod actions;
pub mod config;

use clap::{Arg, ArgMatches, Command};

pub fn build_command() -> Command {
    Command::new("homelink")
        .about("Talk to air conditioner and curtain boards over a single-byte serial link")
        .arg(
            Arg::new("list-ports")
                .long("list-ports")
                .short('l')
                .help("List all available serial ports and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .short('j')
                .help("Output results in JSON format")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("Load port, board and timing from a JSON or TOML file")
                .value_name("FILE")
                .conflicts_with_all(["port", "baud-rate", "board"]),
        )
        .arg(
            Arg::new("port")
                .long("port")
                .short('p')
                .help("Serial port the board is attached to")
                .value_name("PORT"),
        )
        .arg(
            Arg::new("baud-rate")
                .long("baud-rate")
                .help("Serial port baud rate")
                .value_name("BAUD")
                .default_value("9600")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new("board")
                .long("board")
                .short('b')
                .help("Board type: ac or curtain")
                .value_name("BOARD")
                .default_value("ac"),
        )
        .arg(
            Arg::new("simulate")
                .long("simulate")
                .help("Use an in-process simulated board instead of a serial port")
                .action(clap::ArgAction::SetTrue)
                .conflicts_with("port"),
        )
        .arg(
            Arg::new("poll")
                .long("poll")
                .help("Run the poll loop and print snapshots until Ctrl+C or --duration")
                .action(clap::ArgAction::SetTrue)
                .conflicts_with_all(["get", "set"]),
        )
        .arg(
            Arg::new("duration")
                .long("duration")
                .help("Seconds to poll for (default: until interrupted)")
                .value_name("SECS")
                .value_parser(clap::value_parser!(f64))
                .requires("poll"),
        )
        .arg(
            Arg::new("get")
                .long("get")
                .help("Read every channel once with blocking GETs")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("set")
                .long("set")
                .help("Write the board setpoint (desired temperature or curtain position)")
                .value_name("VALUE")
                .value_parser(clap::value_parser!(f64))
                .allow_negative_numbers(true),
        )
}

/// Parse command line arguments and return ArgMatches.
pub fn parse_args() -> ArgMatches {
    build_command().get_matches()
}
