// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::error::Error;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use edgeroute::builder::OsmData;
use edgeroute::engine::BidirectionalOptions;
use edgeroute::graph::{AccessorError, CoordinatePrecision, SerializeOptions};
use edgeroute::osm::{self, CAR_PROFILE};
use edgeroute::GraphAccessor;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
#[error("{0}: {1}")]
struct OsmLoadError(PathBuf, #[source] osm::ReadError);

#[derive(Debug, thiserror::Error)]
#[error("{0}: {1}")]
struct GraphLoadError(PathBuf, #[source] AccessorError);

#[derive(Parser)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Builds a graph file from OSM data, using the car profile
    Build {
        /// The path to the OSM file
        osm_file: PathBuf,

        /// Where to write the graph file
        output: PathBuf,

        /// Use double precision for node coordinates
        #[arg(long)]
        double_precision: bool,

        /// Put all nodes in the spatial index, not only junctions
        #[arg(long)]
        index_all_nodes: bool,
    },

    /// Finds a route over a graph file and prints it as GeoJSON
    Route {
        /// The path to the graph file
        graph_file: PathBuf,

        /// Latitude of the start point
        start_lat: f64,

        /// Longitude of the start point
        start_lon: f64,

        /// Latitude of the end point
        end_lat: f64,

        /// Longitude of the end point
        end_lon: f64,
    },
}

pub fn main() -> Result<(), Box<dyn Error>> {
    colog::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Build {
            osm_file,
            output,
            double_precision,
            index_all_nodes,
        } => {
            let mut data = load_osm(&osm_file)?;
            CAR_PROFILE.apply(&mut data);
            let graph = data.build(|t, j, d| CAR_PROFILE.turn_cost(t, j, d));

            let options = SerializeOptions {
                coordinate_precision: CoordinatePrecision::from_flag(double_precision),
                index_all_nodes,
                ..Default::default()
            };
            graph.serialize(&options)?.write_file(&output)?;
            log::info!("graph written to {}", output.display());
        }

        Command::Route {
            graph_file,
            start_lat,
            start_lon,
            end_lat,
            end_lon,
        } => {
            let g = GraphAccessor::from_file(&graph_file)
                .map_err(|e| GraphLoadError(graph_file.clone(), e))?;

            let route = edgeroute::find_route(
                &g,
                (start_lon, start_lat),
                (end_lon, end_lat),
                &BidirectionalOptions::default(),
            )
            .ok_or("no route between the given positions")?;

            let coordinates: Vec<[f64; 2]> =
                route.geometry.iter().map(|&(lon, lat)| [lon, lat]).collect();
            let collection = json!({
                "type": "FeatureCollection",
                "features": [{
                    "type": "Feature",
                    "properties": {
                        "cost": route.total_cost,
                        "length": route.total_length,
                        "iterations": route.iterations
                    },
                    "geometry": {
                        "type": "LineString",
                        "coordinates": coordinates
                    }
                }]
            });
            println!("{}", serde_json::to_string_pretty(&collection)?);
        }
    }

    Ok(())
}

fn load_osm<P: AsRef<Path>>(path: P) -> Result<OsmData, OsmLoadError> {
    let mut data = OsmData::new();
    osm::add_features_from_file(&mut data, &osm::Options::default(), path.as_ref())
        .map_err(|e| OsmLoadError(path.as_ref().to_path_buf(), e))?;
    Ok(data)
}
