use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use smart_parking::api::parking_config_dto::ParkingConfigDto;
use smart_parking::domain::parking_system_model::ledger::allocation_error::AllocationError;
use smart_parking::domain::parking_system_model::ledger::allocation_ledger::Assignment;
use smart_parking::domain::parking_system_model::parking_system::ParkingSystem;
use smart_parking::domain::parking_system_model::utils::id::{FacilityId, LocationId, VehicleId};
use smart_parking::domain::simulator::simulator::Simulator;
use smart_parking::loader::location_directory::LocationDirectory;
use smart_parking::loader::parser::parse_json_file;
use smart_parking::{build_parking_system, logger, resolve, save_parking_system};

#[derive(Debug, Parser)]
#[command(name = "smart-parking", about = "Routing and slot allocation for city parking facilities")]
struct Cli {
    /// JSON configuration naming the graph, facility and waitlist files.
    #[arg(long, global = true, default_value = "data/config.json")]
    config: PathBuf,

    /// Overrides `RUST_LOG` and the configured log level.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Shortest route between two locations.
    Route {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
    },

    /// Rank facilities for a location and draw a recommendation.
    Recommend {
        #[arg(long)]
        from: String,
    },

    /// Occupancy summary.
    Status,

    /// Park a vehicle at a given lot, or at the best lot with room. Full lots queue the vehicle.
    Park {
        #[arg(long)]
        vehicle: String,
        #[arg(long)]
        lot: Option<String>,
    },

    /// Release a parked vehicle; waiting vehicles may take the slot.
    Free {
        #[arg(long)]
        vehicle: String,
    },

    /// Clear every slot of a lot at once.
    Emergency {
        #[arg(long)]
        lot: String,
    },

    /// Where a vehicle is parked.
    Find {
        #[arg(long)]
        vehicle: String,
    },

    /// Vehicles waiting for a slot, in order.
    Waitlist,

    /// Take a vehicle out of the wait queue.
    Unqueue {
        #[arg(long)]
        vehicle: String,
    },

    /// Random arrivals and departures against the loaded facilities.
    Simulate {
        #[arg(long, default_value_t = 100)]
        steps: usize,

        /// Seed of the arrival generator. Falls back to the configured seed, then 0.
        #[arg(long)]
        seed: Option<u64>,

        /// Write facilities and wait queue back to their files afterwards.
        #[arg(long)]
        save: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config: ParkingConfigDto =
        parse_json_file(&cli.config).with_context(|| format!("Failed to read configuration '{}'", cli.config.display()))?;
    logger::init(&config.log, cli.log_level.as_deref());

    let base_dir = cli.config.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();

    let mut system = build_parking_system(&config, &base_dir).context("Failed to build parking system")?;

    let directory = match &config.location_file {
        Some(file) => Some(LocationDirectory::load(resolve(&base_dir, file))?),
        None => None,
    };

    match cli.command {
        Command::Route { from, to } => {
            let from = known_location(&system, directory.as_ref(), &from)?;
            let to = known_location(&system, directory.as_ref(), &to)?;
            print_route(&system, directory.as_ref(), &from, &to);
        }
        Command::Recommend { from } => {
            let from = known_location(&system, directory.as_ref(), &from)?;
            print_recommendation(&mut system, &from);
        }
        Command::Status => {
            print_status(&system);
        }
        Command::Simulate { steps, seed, save } => {
            let seed = seed.or(config.seed).unwrap_or(0);
            let report = Simulator::new(seed).run(&mut system, steps)?;
            println!("{:#?}", report);
            print_status(&system);

            if save {
                persist(&system, &config, &base_dir)?;
            }
        }
        Command::Park { vehicle, lot } => {
            let vehicle = VehicleId::normalized(&vehicle);
            let outcome = match lot {
                Some(lot) => system.reserve_at(&vehicle, &FacilityId::new(lot.trim())),
                None => system.reserve_any(&vehicle),
            };
            match outcome {
                Ok(facility) => println!("{} parked at lot {}.", vehicle, facility),
                Err(e) if e.queued() => println!("{}", e),
                Err(e) => return Err(e.into()),
            }
            persist(&system, &config, &base_dir)?;
        }
        Command::Free { vehicle } => {
            let report = system.release(&VehicleId::normalized(&vehicle))?;
            println!("{} left lot {}.", report.vehicle, report.facility);
            print_auto_assigned(&report.auto_assigned);
            persist(&system, &config, &base_dir)?;
        }
        Command::Emergency { lot } => {
            let report = system.emergency_release(&FacilityId::new(lot.trim()))?;
            println!("Lot {} cleared: {} slots freed.", report.facility, report.freed_slots);
            for vehicle in &report.freed_vehicles {
                println!("  released {}", vehicle);
            }
            print_auto_assigned(&report.auto_assigned);
            persist(&system, &config, &base_dir)?;
        }
        Command::Find { vehicle } => {
            let vehicle = VehicleId::normalized(&vehicle);
            match system.find_vehicle(&vehicle) {
                Some(facility) => println!("{} is parked at {}", vehicle, facility),
                None if system.ledger().wait_queue().contains(&vehicle) => println!("{} is waiting for a slot.", vehicle),
                None => return Err(AllocationError::VehicleNotParked(vehicle).into()),
            }
        }
        Command::Waitlist => {
            let queue = system.ledger().wait_queue();
            if queue.is_empty() {
                println!("Nobody is waiting.");
            }
            for (position, entry) in queue.iter().enumerate() {
                match &entry.requested {
                    Some(lot) => println!("{}. {} (asked for lot {})", position + 1, entry.vehicle, lot),
                    None => println!("{}. {}", position + 1, entry.vehicle),
                }
            }
        }
        Command::Unqueue { vehicle } => {
            let vehicle = VehicleId::normalized(&vehicle);
            if !system.remove_from_wait_queue(&vehicle) {
                bail!("{} is not in the wait queue", vehicle);
            }
            println!("{} removed from the wait queue.", vehicle);
            persist(&system, &config, &base_dir)?;
        }
    }

    Ok(())
}

fn persist(system: &ParkingSystem, config: &ParkingConfigDto, base_dir: &Path) -> anyhow::Result<()> {
    let saved = save_parking_system(system, config, base_dir).context("Failed to save parking state")?;
    println!("Saved {} facilities.", saved.facilities);
    if saved.reservations.is_none() {
        log::warn!("No reservation file configured; parked vehicles cannot be released by name in a later run.");
    }
    Ok(())
}

fn print_auto_assigned(assigned: &[Assignment]) {
    for assignment in assigned {
        println!("  {} moved from the wait queue to lot {}", assignment.vehicle, assignment.facility);
    }
}

/// Normalizes `raw` and refuses names neither the graph nor the location directory know.
fn known_location(system: &ParkingSystem, directory: Option<&LocationDirectory>, raw: &str) -> anyhow::Result<LocationId> {
    let location = LocationId::normalized(raw);
    let known = system.graph().contains(&location) || directory.is_some_and(|d| d.contains(&location));
    if !known {
        bail!("Unknown location '{}'", raw.trim());
    }
    Ok(location)
}

fn print_route(system: &ParkingSystem, directory: Option<&LocationDirectory>, from: &LocationId, to: &LocationId) {
    let route = system.route(from, to);
    if !route.is_reachable() {
        println!("No route from {} to {}.", from, to);
        return;
    }

    let path: Vec<&str> = route.path.iter().map(LocationId::as_str).collect();
    println!("Route: {}", path.join(" -> "));
    for leg in &route.legs {
        println!("  {} -> {}: {:.2} km", leg.from, leg.to, leg.distance_km);
    }
    println!("Total: {} | Waypoints: {}", route.total, route.waypoint_count());
    if let Some(minutes) = route.estimated_minutes() {
        println!("Estimated travel time: {:.0} min", minutes);
    }
    if let Some(straight) = directory.and_then(|d| d.distance_km(from, to)) {
        println!("Straight-line distance: {:.2} km", straight);
    }
}

fn print_recommendation(system: &mut ParkingSystem, from: &LocationId) {
    let Some(recommendation) = system.recommend(from) else {
        println!("No facility has a free slot.");
        return;
    };

    println!("Candidates for {}:", from);
    for (rank, scored) in recommendation.ranked.iter().take(5).enumerate() {
        let amenities = system.ledger().facility(&scored.facility).map(|f| f.amenities.labels().join(", ")).unwrap_or_default();
        println!(
            "{}. Lot {} at {} | Score {:.3} | {:.1} km | Cost factor {:.2} | Amenity factor {:.2} | {}",
            rank + 1,
            scored.facility,
            scored.location,
            scored.score,
            scored.distance_km,
            scored.factors.cost,
            scored.factors.amenities,
            amenities
        );
    }

    println!("Selection probabilities:");
    for (facility, probability) in &recommendation.selection.probabilities {
        println!("  Lot {}: {:.1}%", facility, probability * 100.0);
    }
    println!("Recommended: lot {}", recommendation.chosen());
}

fn print_status(system: &ParkingSystem) {
    let status = system.status();
    println!("{}", status);
    for facility in system.ledger().facilities() {
        println!("  {}", facility);
    }
    if !status.waiting.is_empty() {
        let waiting: Vec<String> = status.waiting.iter().map(ToString::to_string).collect();
        println!("Wait queue: {}", waiting.join(", "));
    }
}
