mod common;

use rand::SeedableRng;
use rand_xorshift::XorShiftRng;

use raw_map::RestrictionType;

use common::{convert, GraphBuilder};

/// A signalized crossroads, a couplet of oneway streets, and a restricted junction, far enough
/// apart not to interact
fn neighborhood() -> GraphBuilder {
    let mut b = GraphBuilder::new();

    b.signal(1, 0.0, 0.0)
        .node(2, -200.0, 0.0)
        .node(3, 0.0, -200.0)
        .node(4, 200.0, 0.0)
        .node(5, 0.0, 200.0)
        .way(
            10,
            &[2, 1, 4],
            &[
                ("highway", "primary"),
                ("lanes", "4"),
                ("turn:lanes", "left|through;right"),
            ],
        )
        .way(11, &[3, 1, 5], &[("highway", "secondary"), ("lanes", "3")]);

    // Shares node 4 with the crossroads
    b.node(20, 1000.0, 0.0)
        .node(21, 1020.0, 0.0)
        .node(22, 1020.0, 20.0)
        .node(23, 1000.0, 20.0)
        .node(24, 1200.0, 200.0)
        .node(25, 1000.0, 200.0);
    let square = &[("highway", "tertiary"), ("oneway", "yes")];
    b.way(20, &[20, 21], square)
        .way(21, &[21, 22], square)
        .way(22, &[22, 23], square)
        .way(23, &[23, 20], square)
        .way(24, &[4, 20], &[("highway", "secondary")])
        .way(25, &[22, 24], &[("highway", "residential")])
        .way(26, &[23, 25], &[("highway", "residential"), ("maxspeed", "20 mph")]);

    b.node(30, 0.0, 1000.0)
        .node(31, -200.0, 1000.0)
        .node(32, 200.0, 1000.0)
        .node(33, 0.0, 1200.0)
        .way(30, &[5, 30], &[("highway", "residential")])
        .way(31, &[31, 30, 32], &[("highway", "unclassified"), ("lanes", "4")])
        .way(32, &[30, 33], &[("highway", "living_street")])
        .restriction(900, 30, 30, 32, RestrictionType::BanTurns)
        .restriction(901, 32, 30, 31, RestrictionType::OnlyAllowTurns);

    b
}

#[test]
fn insertion_order_doesnt_matter() {
    let b = neighborhood();
    let (net, report) = convert(b.build());
    let expected_net = abstutil::to_json(&net);
    let expected_report = abstutil::to_json(&report);
    assert!(!net.lanes.is_empty());
    assert!(!net.signals.is_empty());

    for seed in [1, 2, 3] {
        let mut rng = XorShiftRng::seed_from_u64(seed);
        let (net, report) = convert(b.build_shuffled(&mut rng));
        assert_eq!(abstutil::to_json(&net), expected_net, "seed {}", seed);
        assert_eq!(abstutil::to_json(&report), expected_report, "seed {}", seed);
    }
}

#[test]
fn converting_twice_matches() {
    let b = neighborhood();
    let (net1, report1) = convert(b.build());
    let (net2, report2) = convert(b.build());
    assert_eq!(net1, net2);
    assert_eq!(report1, report2);
}
