use geom::{ControlPoint, Distance, Pt2D, SplineKind};
use road_network::{
    find_all_intersections, find_intersections, find_intersections_3d, ContactPoint,
    ElevationProfile, JunctionID, LaneSection, RoadEnd, RoadID, RoadJunctionState, RoadLink,
    RoadNetwork, SegmentRef, SplineID,
};

fn straight(x1: f64, y1: f64, x2: f64, y2: f64) -> Vec<ControlPoint> {
    vec![
        ControlPoint::new(Pt2D::new(x1, y1)),
        ControlPoint::new(Pt2D::new(x2, y2)),
    ]
}

fn pts(raw: &[(f64, f64)]) -> Vec<ControlPoint> {
    raw.iter()
        .map(|(x, y)| ControlPoint::new(Pt2D::new(*x, *y)))
        .collect()
}

fn three_lanes() -> LaneSection {
    LaneSection::driving(3, 3, Distance::meters(3.6))
}

fn one_each_way() -> LaneSection {
    LaneSection::driving(1, 1, Distance::meters(3.6))
}

// Road A along x and road B along y, both from -50 to 50.
fn four_way() -> (RoadNetwork, SplineID, SplineID) {
    abstutil::logger::setup_for_tests();
    let mut net = RoadNetwork::default();
    let (a, _) = net
        .add_spline(SplineKind::Auto, straight(-50.0, 0.0, 50.0, 0.0), three_lanes())
        .unwrap();
    let (b, _) = net
        .add_spline(SplineKind::Auto, straight(0.0, -50.0, 0.0, 50.0), three_lanes())
        .unwrap();
    (net, a, b)
}

fn only_junction(net: &RoadNetwork) -> JunctionID {
    let ids: Vec<JunctionID> = net.all_junctions().map(|j| j.id).collect();
    assert_eq!(ids.len(), 1);
    ids[0]
}

#[test]
fn two_roads_cross_once() {
    let mut net = RoadNetwork::default();
    net.config.auto_junctions = false;
    net.add_spline(SplineKind::Auto, straight(-50.0, 0.0, 50.0, 0.0), three_lanes())
        .unwrap();
    net.add_spline(SplineKind::Auto, straight(0.0, -50.0, 0.0, 50.0), three_lanes())
        .unwrap();
    assert_eq!(net.num_roads(), 2);
    assert_eq!(net.num_junctions(), 0);

    let hits = find_all_intersections(&net);
    assert_eq!(hits.len(), 1);
    assert!(hits[0].point.approx_eq(Pt2D::new(0.0, 0.0), Distance::meters(1e-6)));
    assert!(hits[0]
        .s_a
        .approx_eq(Distance::meters(50.0), Distance::meters(1e-6)));
    assert_eq!(
        net.junction_state(hits[0].road_a).unwrap(),
        RoadJunctionState::SingleIntersection
    );
}

#[test]
fn crossing_makes_a_junction() {
    let (net, a, b) = four_way();
    let j = only_junction(&net);
    let junction = net.get_j(j).unwrap();
    assert!(junction.auto);
    assert_eq!(junction.connections.len(), 12);
    assert_eq!(net.num_roads(), 16);
    assert_eq!(net.road_ends_at(j).len(), 4);

    // Every connection links all three lanes
    let summary = net.summary();
    assert_eq!(summary.splines, 2);
    assert_eq!(summary.connecting_roads, 12);
    assert_eq!(summary.lane_links, 36);

    // Both splines are cut for half the other road's width around the crossing
    for spline in [a, b] {
        let span = net.get_s(spline).unwrap().span_of(SegmentRef::Junction(j)).unwrap();
        assert!(span.0.approx_eq(Distance::meters(39.2), Distance::meters(1e-6)));
        assert!(span.1.approx_eq(Distance::meters(60.8), Distance::meters(1e-6)));
        let roads = net.roads_on_spline(spline).unwrap();
        assert_eq!(roads.len(), 2);
        assert_eq!(
            net.junction_state(roads[0]).unwrap(),
            RoadJunctionState::JunctionExists
        );
    }
    net.validate().unwrap();
}

#[test]
fn removing_a_road_shrinks_the_junction() {
    let (mut net, a, _) = four_way();
    let j = only_junction(&net);
    let a2 = net.roads_on_spline(a).unwrap()[1];

    let effects = net.remove_road(a2).unwrap();
    assert!(effects.deleted_roads.contains(&a2));
    assert!(effects.changed_junctions.contains(&j));

    assert_eq!(only_junction(&net), j);
    assert_eq!(net.get_j(j).unwrap().connections.len(), 6);
    assert_eq!(net.num_roads(), 9);
    // The junction takes over the rest of the spline
    let span = net.get_s(a).unwrap().span_of(SegmentRef::Junction(j)).unwrap();
    assert!(span.1.approx_eq(Distance::meters(100.0), Distance::meters(1e-6)));
    net.validate().unwrap();
}

#[test]
fn removing_the_crossing_road_deletes_the_junction() {
    let (mut net, a, b) = four_way();
    net.remove_spline(b).unwrap();

    assert_eq!(net.num_junctions(), 0);
    assert_eq!(net.num_roads(), 1);
    let road = net.get_r(net.roads_on_spline(a).unwrap()[0]).unwrap();
    assert!(road
        .length()
        .approx_eq(Distance::meters(100.0), Distance::meters(1e-3)));
    assert_eq!(road.predecessor, None);
    assert_eq!(road.successor, None);
    net.validate().unwrap();
}

#[test]
fn rebuilding_is_idempotent() {
    let (mut net, _, _) = four_way();
    let j = only_junction(&net);
    let before = net.get_j(j).unwrap().lane_link_pairs();

    net.rebuild_connections(j).unwrap();
    let once = net.get_j(j).unwrap().lane_link_pairs();
    net.rebuild_connections(j).unwrap();
    let twice = net.get_j(j).unwrap().lane_link_pairs();

    assert_eq!(before, once);
    assert_eq!(once, twice);
    assert_eq!(net.get_j(j).unwrap().connections.len(), 12);
    assert_eq!(net.num_roads(), 16);

    net.rebuild_all().unwrap();
    assert_eq!(only_junction(&net), j);
    assert_eq!(net.get_j(j).unwrap().lane_link_pairs(), before);
}

#[test]
fn connecting_roads_follow_their_lanes() {
    let (net, _, _) = four_way();
    let j = only_junction(&net);
    let junction = net.get_j(j).unwrap();
    for conn in junction.connections.values() {
        let road = net.get_r(conn.connecting_road).unwrap();
        assert_eq!(road.junction, Some(j));
        road.validate().unwrap();

        let from = net.get_r(conn.incoming.road).unwrap();
        let to = net.get_r(conn.outgoing.road).unwrap();
        let start = from.end_state(conn.incoming.contact).pt;
        let end = to.end_state(conn.outgoing.contact).pt;
        assert!(road
            .end_state(ContactPoint::Start)
            .pt
            .approx_eq(start, Distance::meters(1e-3)));
        assert!(road
            .end_state(ContactPoint::End)
            .pt
            .approx_eq(end, Distance::meters(1e-3)));
    }
    assert!(road_network::connectivity::find_orphan_lanes(&net, j)
        .unwrap()
        .is_empty());
}

#[test]
fn bridges_dont_make_junctions() {
    let (mut net, a, b) = four_way();
    net.set_elevation(b, ElevationProfile::constant(10.0)).unwrap();

    assert_eq!(net.num_junctions(), 0);
    assert_eq!(net.num_roads(), 2);
    let ra = net.roads_on_spline(a).unwrap()[0];
    let rb = net.roads_on_spline(b).unwrap()[0];
    assert_eq!(find_intersections(&net, ra).len(), 1);
    assert!(find_intersections_3d(&net, ra).is_empty());
    assert_eq!(
        net.junction_state(rb).unwrap(),
        RoadJunctionState::NoIntersection
    );

    // Bringing it back down to the same level makes the junction again
    net.set_elevation(a, ElevationProfile::constant(10.5)).unwrap();
    let j = only_junction(&net);
    assert_eq!(net.get_j(j).unwrap().connections.len(), 12);
}

#[test]
fn cutting_a_connecting_road_is_rejected() {
    let (mut net, _, _) = four_way();
    let j = only_junction(&net);
    let cr = net.get_j(j).unwrap().connecting_roads()[0];
    let before = net.clone();

    assert!(net
        .divide_road_at(cr, Distance::meters(1.0))
        .is_err());
    assert!(net
        .add_lane(cr, road_network::LaneSide::Right, road_network::LaneType::Driving, None)
        .is_err());
    assert_eq!(net, before);

    // Removing a connecting road removes just its connection
    net.remove_road(cr).unwrap();
    assert_eq!(net.get_j(j).unwrap().connections.len(), 11);
    assert!(!net.road_exists(cr));
}

#[test]
fn moving_a_road_away_removes_the_junction() {
    let (mut net, _, b) = four_way();
    net.set_control_points(b, straight(80.0, -50.0, 80.0, 50.0))
        .unwrap();
    assert_eq!(net.num_junctions(), 0);
    assert_eq!(net.num_roads(), 2);

    net.set_control_points(b, straight(0.0, -50.0, 0.0, 50.0))
        .unwrap();
    let j = only_junction(&net);
    assert_eq!(net.get_j(j).unwrap().connections.len(), 12);
    // Road A keeps its id for the part before the junction
    assert!(net
        .road_ends_at(j)
        .contains(&RoadEnd::new(RoadID(0), ContactPoint::End)));
}

#[test]
fn curving_a_road_keeps_the_junction() {
    let (mut net, a, b) = four_way();
    let j = only_junction(&net);
    net.set_control_points(
        a,
        pts(&[(-50.0, 0.0), (20.0, 10.0), (50.0, 0.0)]),
    )
    .unwrap();

    // A still runs through the middle of the junction, so it joins it again
    assert_eq!(only_junction(&net), j);
    let junction = net.get_j(j).unwrap();
    assert_eq!(net.road_ends_at(j).len(), 4);
    assert_eq!(junction.connections.len(), 12);
    assert_eq!(net.roads_on_spline(a).unwrap().len(), 2);
    assert_eq!(net.roads_on_spline(b).unwrap().len(), 2);
    for conn in junction.connections.values() {
        geom::check_continuity(&net.get_r(conn.connecting_road).unwrap().geometry).unwrap();
    }
    net.validate().unwrap();
}

#[test]
fn t_junction() {
    abstutil::logger::setup_for_tests();
    let mut net = RoadNetwork::default();
    let (a, _) = net
        .add_spline(SplineKind::Auto, straight(-50.0, 0.0, 50.0, 0.0), one_each_way())
        .unwrap();
    let (stem, _) = net
        .add_spline(SplineKind::Auto, straight(0.0, -50.0, 0.0, 0.0), one_each_way())
        .unwrap();

    let j = only_junction(&net);
    assert_eq!(net.road_ends_at(j).len(), 3);
    assert_eq!(net.get_j(j).unwrap().connections.len(), 6);
    assert_eq!(net.num_roads(), 9);
    assert_eq!(net.roads_on_spline(a).unwrap().len(), 2);
    let stem_road = net.roads_on_spline(stem).unwrap()[0];
    assert_eq!(
        net.get_r(stem_road).unwrap().successor,
        Some(RoadLink::Junction(j))
    );
    // The junction takes over the end of the stem
    let span = net.get_s(stem).unwrap().span_of(SegmentRef::Junction(j)).unwrap();
    assert!(span.1.approx_eq(Distance::meters(50.0), Distance::meters(1e-6)));
    net.validate().unwrap();
}

#[test]
fn crossing_two_roads() {
    abstutil::logger::setup_for_tests();
    let mut net = RoadNetwork::default();
    net.add_spline(SplineKind::Auto, straight(-20.0, -50.0, -20.0, 50.0), three_lanes())
        .unwrap();
    net.add_spline(SplineKind::Auto, straight(20.0, -50.0, 20.0, 50.0), three_lanes())
        .unwrap();
    let (r, _) = net
        .add_spline(SplineKind::Auto, straight(-50.0, 0.0, 50.0, 0.0), three_lanes())
        .unwrap();

    assert_eq!(net.num_junctions(), 2);
    for junction in net.all_junctions() {
        assert_eq!(net.road_ends_at(junction.id).len(), 4);
        assert_eq!(junction.connections.len(), 12);
    }
    assert_eq!(net.num_roads(), 2 + 2 + 3 + 24);

    // The piece between the two junctions
    let roads = net.roads_on_spline(r).unwrap();
    assert_eq!(roads.len(), 3);
    assert!(net
        .get_r(roads[1])
        .unwrap()
        .length()
        .approx_eq(Distance::meters(18.4), Distance::meters(1e-6)));
    net.validate().unwrap();
}

#[test]
fn road_through_a_junction_joins_it() {
    let (mut net, _, _) = four_way();
    let j = only_junction(&net);
    let (c, _) = net
        .add_spline(SplineKind::Auto, straight(-50.0, -50.0, 50.0, 50.0), three_lanes())
        .unwrap();

    assert_eq!(only_junction(&net), j);
    assert_eq!(net.road_ends_at(j).len(), 6);
    assert_eq!(net.get_j(j).unwrap().connections.len(), 30);
    assert_eq!(net.summary().lane_links, 90);
    assert_eq!(net.num_roads(), 2 + 2 + 2 + 30);

    let roads = net.roads_on_spline(c).unwrap();
    assert_eq!(roads.len(), 2);
    for r in roads {
        assert_eq!(
            net.junction_state(r).unwrap(),
            RoadJunctionState::JunctionExists
        );
    }
    net.validate().unwrap();

    // Taking it away again leaves the original junction
    net.remove_spline(c).unwrap();
    assert_eq!(only_junction(&net), j);
    assert_eq!(net.road_ends_at(j).len(), 4);
    assert_eq!(net.get_j(j).unwrap().connections.len(), 12);
}

#[test]
fn road_clipping_a_junction_joins_it() {
    // Narrow roads, so C crosses A's road close to the junction rather than through its middle
    abstutil::logger::setup_for_tests();
    let mut net = RoadNetwork::default();
    let (a, _) = net
        .add_spline(SplineKind::Auto, straight(-50.0, 0.0, 50.0, 0.0), one_each_way())
        .unwrap();
    net.add_spline(SplineKind::Auto, straight(0.0, -50.0, 0.0, 50.0), one_each_way())
        .unwrap();
    let j = only_junction(&net);
    let (c, _) = net
        .add_spline(SplineKind::Auto, straight(4.5, -50.0, 4.5, 50.0), one_each_way())
        .unwrap();

    assert_eq!(only_junction(&net), j);
    assert_eq!(net.road_ends_at(j).len(), 6);
    assert_eq!(net.roads_on_spline(c).unwrap().len(), 2);
    // A already had the junction, so it isn't cut again
    assert_eq!(net.roads_on_spline(a).unwrap().len(), 2);
    net.validate().unwrap();
}

#[test]
fn bridge_over_a_junction_stays_apart() {
    let (mut net, _, _) = four_way();
    let j = only_junction(&net);
    let (c, _) = net
        .add_spline(SplineKind::Auto, straight(-50.0, -50.0, 50.0, 50.0), three_lanes())
        .unwrap();
    assert_eq!(net.road_ends_at(j).len(), 6);

    net.set_elevation(c, ElevationProfile::constant(8.0)).unwrap();
    assert_eq!(only_junction(&net), j);
    assert_eq!(net.road_ends_at(j).len(), 4);
    assert_eq!(net.get_j(j).unwrap().connections.len(), 12);
    assert_eq!(net.roads_on_spline(c).unwrap().len(), 1);
}
