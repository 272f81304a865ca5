use anyhow::Result;

fn main() -> Result<()> {
    homelink::boot::init_logger();
    let matches = homelink::cli::parse_args();
    homelink::cli::actions::run(&matches)
}
