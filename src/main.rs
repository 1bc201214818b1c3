use std::collections::HashMap;
use std::sync::Arc;

use clap::Parser;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

extern crate broadside;

use broadside::events::LoggingObserver;
use broadside::{load_ship_classes_from_file, DamageRouter, SectionType, ShipClassConfig};

/// Fire a sequence of already-landed hits at a ship and print the damage report for each one.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// JSON file holding an array of ship classes.  Uses the built in frigate if not given.
    #[arg(short = 'f', long)]
    class_file: Option<String>,

    /// Name of the ship class to build
    #[arg(short, long, default_value = "Frigate")]
    class: String,

    /// Name given to the ship in logs
    #[arg(short, long, default_value = "Target")]
    name: String,

    /// Hits to resolve, in order, as SECTION:AMOUNT pairs separated by commas
    #[arg(long, default_value = "Fore:30,Fore:90,Core:50,Aft:120,Core:200")]
    hits: String,

    /// Seed for the ship's random number generator
    #[arg(short, long)]
    seed: Option<u64>,

    /// Run in test mode. Specifically, this will use a fixed random number generator.
    #[arg(short, long)]
    test: bool,

    /// Pretty print the JSON reports
    #[arg(short, long)]
    pretty: bool,
}

fn get_rng(test_mode: bool, seed: Option<u64>) -> Box<dyn RngCore + Send> {
    match seed {
        Some(seed) => {
            info!("(main.get_rng) Using seed {seed} for random numbers.");
            Box::new(StdRng::seed_from_u64(seed))
        }
        None if test_mode => {
            info!("(main.get_rng) TEST mode for random numbers (constant seed of 0).");
            Box::new(StdRng::seed_from_u64(0))
        }
        None => {
            debug!("(main.get_rng) Standard mode for random numbers.");
            Box::new(StdRng::from_entropy())
        }
    }
}

fn parse_hits(hits: &str) -> Result<Vec<(SectionType, f64)>, Box<dyn std::error::Error>> {
    hits.split(',')
        .filter(|hit| !hit.trim().is_empty())
        .map(|hit| -> Result<(SectionType, f64), Box<dyn std::error::Error>> {
            let (section, amount) = hit
                .split_once(':')
                .ok_or_else(|| format!("Hit '{hit}' should look like SECTION:AMOUNT"))?;
            Ok((section.parse::<SectionType>()?, amount.trim().parse::<f64>()?))
        })
        .collect()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let args = Args::parse();

    let classes: HashMap<String, Arc<ShipClassConfig>> = match &args.class_file {
        Some(file_name) => {
            let classes = load_ship_classes_from_file(file_name)?;
            info!("(main) Loaded {} ship classes from {file_name}.", classes.len());
            classes
        }
        None => {
            let frigate = ShipClassConfig::default();
            HashMap::from([(frigate.name.clone(), Arc::new(frigate))])
        }
    };

    let class = classes
        .get(&args.class)
        .ok_or_else(|| format!("No ship class named {}", args.class))?;

    let hits = parse_hits(&args.hits)?;
    let mut ship = DamageRouter::from_config(&args.name, class, get_rng(args.test, args.seed))?;
    ship.subscribe(Box::new(LoggingObserver::new(&args.name)));

    for (section, amount) in hits {
        let report = ship.process_damage(amount, section);
        info!("(main) {report}");
        let json = if args.pretty {
            serde_json::to_string_pretty(&report)?
        } else {
            serde_json::to_string(&report)?
        };
        println!("{json}");
    }

    let sections = ship.sections();
    info!(
        "(main) {} finished with shields {:.0}%, integrity {:.0}%, breached {:?}, {} critical rolls ({} system hits).",
        ship.name(),
        ship.shields().percentage() * 100.0,
        sections.overall_integrity() * 100.0,
        sections.breached_sections(),
        ship.critical_hits().total_rolls(),
        ship.critical_hits().system_hits()
    );

    Ok(())
}
