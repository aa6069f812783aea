use anyhow::Result;

use road_network::{connectivity, RoadNetwork};

pub fn run(mut net: RoadNetwork, output: String) -> Result<()> {
    let before = net.summary();
    let effects = net.rebuild_all()?;
    let after = net.summary();
    info!(
        "Junctions: {} -> {}. Connections: {} -> {}. Lane links: {} -> {}",
        before.junctions,
        after.junctions,
        before.connections,
        after.connections,
        before.lane_links,
        after.lane_links
    );
    info!(
        "{} roads changed, {} deleted",
        effects.changed_roads.len(),
        effects.deleted_roads.len()
    );

    for junction in net.all_junctions() {
        for (r, lane) in connectivity::find_orphan_lanes(&net, junction.id)? {
            warn!("Lane {} of {} doesn't lead anywhere in {}", lane, r, junction.id);
        }
    }
    let (_, disconnected) = connectivity::find_disconnected_lanes(&net);
    if !disconnected.is_empty() {
        info!(
            "{} driving lanes aren't reachable from the biggest connected group",
            disconnected.len()
        );
    }

    net.save_json(&output)
}
