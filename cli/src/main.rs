//! Tools for working with road network documents from the command line: fitting splines, finding
//! intersections, and rebuilding junctions.

#[macro_use]
extern crate log;

mod rebuild;

use anyhow::Result;
use serde::Serialize;
use structopt::StructOpt;

use geom::{ControlPoint, SplineKind};
use road_network::{find_all_intersections, NetworkConfig, RoadNetwork};

#[derive(StructOpt)]
#[structopt(name = "road_cli", about = "Inspect and rebuild road networks")]
enum Command {
    /// Fits a spline through control points and prints the segments as JSON
    Fit {
        /// The path to a JSON list of control points
        #[structopt(long)]
        input: String,
        /// Join every pair of points with curves respecting their headings, instead of rounding
        /// off corners
        #[structopt(long)]
        explicit: bool,
    },
    /// Prints every place where two roads cross as JSON
    Intersections {
        /// The path to a road network
        #[structopt(long)]
        input: String,
        /// Overrides the network's own settings
        #[structopt(long)]
        config: Option<String>,
    },
    /// Detects intersections again, rebuilds every junction, and saves the result
    Rebuild {
        /// The path to a road network
        #[structopt(long)]
        input: String,
        /// Where to write the rebuilt network
        #[structopt(long)]
        output: String,
        /// Overrides the network's own settings
        #[structopt(long)]
        config: Option<String>,
    },
    /// Prints how many splines, roads, junctions and connections a network has
    Summary {
        /// The path to a road network
        #[structopt(long)]
        input: String,
    },
}

fn main() -> Result<()> {
    abstutil::logger::setup();

    match Command::from_args() {
        Command::Fit { input, explicit } => fit(input, explicit)?,
        Command::Intersections { input, config } => {
            let net = load(&input, config)?;
            print_json(&find_all_intersections(&net));
        }
        Command::Rebuild {
            input,
            output,
            config,
        } => rebuild::run(load(&input, config)?, output)?,
        Command::Summary { input } => {
            let net = RoadNetwork::load_json(&input)?;
            print_json(&net.summary());
        }
    }
    Ok(())
}

fn fit(input: String, explicit: bool) -> Result<()> {
    let control_points: Vec<ControlPoint> = abstutil::read_json(&input)?;
    let kind = if explicit {
        SplineKind::Explicit
    } else {
        SplineKind::Auto
    };
    let segments = geom::fit::fit_spline(kind, &control_points)?;
    info!(
        "Fit {} segments, {} long",
        segments.len(),
        geom::chain_length(&segments)
    );
    print_json(&segments);
    Ok(())
}

fn load(path: &str, config: Option<String>) -> Result<RoadNetwork> {
    let mut net = RoadNetwork::load_json(path)?;
    if let Some(config) = config {
        let config: NetworkConfig = abstutil::read_json(&config)?;
        net.config = config;
    }
    Ok(net)
}

fn print_json<T: Serialize>(obj: &T) {
    println!("{}", abstutil::to_json(obj));
}
