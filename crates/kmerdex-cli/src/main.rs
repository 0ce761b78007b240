use kmerdex_cli::input::{Input, Mode};
use kmerdex_cli::Runner;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::default()
        .filter_level(log::LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("KMERDEX_LOG", "error,kmerdex=info"))
        .init();

    let matches = kmerdex_cli::command().get_matches();

    let (mode, matches) = match matches.subcommand() {
        Some(("build", matches)) => (Mode::Build, matches),
        Some(("search", matches)) => (Mode::Search, matches),
        _ => unreachable!("subcommand is required"),
    };

    let input = Input::from_arguments(matches, mode)?;
    let runner = input.build().map(Runner::new)?;
    runner.run(mode)?;

    Ok(())
}
