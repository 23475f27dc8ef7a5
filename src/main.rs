use fern::Dispatch;
use log::{info, LevelFilter};
use pocketboy::error::{PocketboyError, RomFileUnreadableSnafu};
use pocketboy::gameboy::GameBoy;
use pocketboy::sm83::models::Model;
use snafu::prelude::*;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let log_to_file = args.iter().any(|arg| arg == "--log-to-file");

    setup_logging(log_to_file);

    let model = match args.iter().position(|arg| arg == "--model") {
        Some(idx) => args
            .get(idx + 1)
            .expect("--model needs a value")
            .parse::<Model>()
            .unwrap_or_else(|e| {
                eprintln!("{}", e);
                std::process::exit(1);
            }),
        None => Model::Original,
    };

    let filepath = args.get(1).expect("No ROM file provided");
    let rom = load_rom(filepath).unwrap_or_else(|e| {
        eprintln!("{}", e);
        std::process::exit(1);
    });

    let mut gameboy = GameBoy::new(rom, model).unwrap_or_else(|e| {
        eprintln!("{}", e);
        std::process::exit(1);
    });
    let handle = gameboy.handle();

    let cpu_thread = std::thread::spawn(move || gameboy.run());

    info!("Running headless; press enter to stop");
    let _ = std::io::stdin().read_line(&mut String::new());

    handle.stop();
    let _ = cpu_thread.join();
}

fn load_rom(filepath: &str) -> Result<Vec<u8>, PocketboyError> {
    std::fs::read(filepath).context(RomFileUnreadableSnafu { path: filepath })
}

fn setup_logging(log_to_file: bool) {
    const LOG_PATH: &str = "./pocketboy_trace.log";
    std::fs::remove_file(LOG_PATH).unwrap_or_default();

    let mut base_config = Dispatch::new()
        .level(LevelFilter::Trace)
        .chain(Dispatch::new().level(LevelFilter::Info).chain(std::io::stdout()))
        .format(move |out, message, record| out.finish(format_args!("[{}] {}", record.level(), message)));

    if log_to_file {
        base_config = base_config.chain(
            Dispatch::new()
                .level(LevelFilter::Trace)
                .chain(fern::log_file(LOG_PATH).unwrap()),
        );
    }

    base_config.apply().unwrap();
}
