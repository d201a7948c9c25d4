//! Turns a raw street graph into a simplified directed network for microsimulation: links with
//! lane tables and turn permissions, plus fixed-cycle signal plans.

#[macro_use]
extern crate log;

mod clustering;
mod config;
mod lanes;
mod osm;
mod report;
mod signals;
mod topology;
mod traffic_signals;
mod turn_lanes;
mod usage;

use anyhow::Result;

use abstutil::Timer;
use map_model::Network;
use raw_map::RawGraph;

pub use crate::config::{
    ClusterConfig, ConversionConfig, HierarchyLayer, HighwayDefaults, LaneAssignmentConfig,
    MidLaneMode, OutLaneMode, SignalRelocationConfig, SignalTimings,
};
pub use crate::lanes::{order_downstream_links, Candidate};
pub use crate::report::{ClusterPolicy, ConversionReport};
pub use crate::turn_lanes::{TurnDirection, TurnFamily};

/// Runs the whole pipeline. The only hard failure is a signalized junction the signal planner
/// can't handle, and only in strict mode; everything else unusual winds up in the report.
pub fn convert(
    mut graph: RawGraph,
    config: &ConversionConfig,
    timer: &mut Timer,
) -> Result<(Network, ConversionReport)> {
    let mut report = ConversionReport::default();
    report.incomplete_restrictions = graph.incomplete_restrictions.clone();

    timer.start("mark used nodes");
    usage::mark_used(&mut graph, config, &mut report, timer);
    timer.stop("mark used nodes");

    timer.start("consolidate signals");
    signals::consolidate(&mut graph, &config.signal_relocation, &mut report, timer);
    timer.stop("consolidate signals");

    if !config.keep_paths {
        timer.start("collapse paths");
        usage::collapse_paths(&mut graph);
        timer.stop("collapse paths");
    }

    timer.start("merge junctions");
    clustering::merge_junctions(&mut graph, &config.clusters, &mut report, timer);
    timer.stop("merge junctions");

    timer.start("materialize links");
    let mut topo = topology::materialize(&graph, config, &mut report, timer);
    timer.stop("materialize links");

    timer.start("assign lanes");
    let tables = lanes::assign_lanes(&topo, &config.lanes, &mut report, timer);
    timer.stop("assign lanes");
    topo.network.lanes = tables;

    timer.start("synthesize signals");
    traffic_signals::synthesize(
        &mut topo.network,
        &topo.signalized,
        &config.signal_timings,
        config.strict,
        &mut report,
        timer,
    )?;
    timer.stop("synthesize signals");

    let network = topo.network;
    report.record_sizes(&network);
    for line in report.describe() {
        info!("{}", line);
    }
    Ok((network, report))
}
