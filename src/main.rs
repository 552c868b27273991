use clap::{value_parser, Arg, ArgAction, Command as ClapCommand};
use log::{error, LevelFilter};
use std::path::PathBuf;
use std::process;

use scenekit::commands::{CommandFactory, ScenekitCommandFactory};
use scenekit::config::Config;
use scenekit::utils::logger::Logger;

fn coordinate_args(command: ClapCommand) -> ClapCommand {
    command
        .arg(
            Arg::new("lat")
                .long("lat")
                .help("Latitude in decimal degrees (WGS84)")
                .value_name("DEGREES")
                .value_parser(value_parser!(f64))
                .allow_hyphen_values(true)
                .required(true),
        )
        .arg(
            Arg::new("lon")
                .long("lon")
                .help("Longitude in decimal degrees (WGS84)")
                .value_name("DEGREES")
                .value_parser(value_parser!(f64))
                .allow_hyphen_values(true)
                .required(true),
        )
}

fn size_arg() -> Arg {
    Arg::new("size")
        .long("size")
        .help("Side length of the pixel neighborhood (odd)")
        .value_name("N")
        .value_parser(value_parser!(usize))
        .required(false)
}

fn main() {
    let matches = ClapCommand::new("SceneKit")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Maurice Schilpp")
        .about("Find Landsat scenes at a coordinate and extract the pixels around it")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help("Configuration file (TOML)")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable debug output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            coordinate_args(ClapCommand::new("search").about("List scenes covering a coordinate"))
                .arg(
                    Arg::new("start")
                        .long("start")
                        .help("First acquisition date (YYYY-MM-DD)")
                        .value_name("DATE"),
                )
                .arg(
                    Arg::new("end")
                        .long("end")
                        .help("Last acquisition date (YYYY-MM-DD)")
                        .value_name("DATE"),
                )
                .arg(
                    Arg::new("max-cloud")
                        .long("max-cloud")
                        .help("Maximum cloud cover in percent")
                        .value_name("PERCENT")
                        .value_parser(value_parser!(f64)),
                ),
        )
        .subcommand(
            coordinate_args(ClapCommand::new("extract").about("Extract, normalize and store the pixels around a coordinate"))
                .arg(
                    Arg::new("scene-id")
                        .long("scene-id")
                        .help("Scene to read; defaults to the first search match")
                        .value_name("ID"),
                )
                .arg(size_arg()),
        )
        .subcommand(
            coordinate_args(ClapCommand::new("inspect").about("Read the pixels around a coordinate from a local GeoTIFF"))
                .arg(
                    Arg::new("input")
                        .help("Input GeoTIFF file")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("band")
                        .long("band")
                        .help("Band name recorded with the samples")
                        .value_name("BAND"),
                )
                .arg(size_arg()),
        )
        .get_matches();

    let config = match Config::load_or_default(matches.get_one::<PathBuf>("config").map(PathBuf::as_path)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            process::exit(1);
        }
    };

    let level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        config.logging.level_filter().unwrap_or(LevelFilter::Info)
    };
    if let Err(e) = Logger::init_global_logger(&config.logging.file, level) {
        eprintln!("Error setting up global logger: {}", e);
        process::exit(1);
    }

    let factory = ScenekitCommandFactory::new();

    let command_result = factory.create_command(&matches, &config);
    match command_result {
        Ok(command) => {
            if let Err(e) = command.execute() {
                error!("Command execution error: {}", e);
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        },
        Err(e) => {
            error!("Failed to create command: {}", e);
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };
}
