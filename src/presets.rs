//! Built-in road networks.
//!
//! Traffic drives on the right. Each two-way road carries one lane per direction,
//! offset a quarter of the lane width from the road's centre line. Turn labels are
//! relative to the driver.

use crate::math::{Point2d, Vector2d};
use crate::network::{
    ArrivalDesc, GroupDesc, IntersectionDesc, ManoeuvreDesc, MovementDesc, NetworkDesc,
    SegmentDesc, YieldDesc,
};
use crate::params::Geometry;
use crate::vehicle::Turn;

/// The layout of the three T-junction reference network.
///
/// A two-way main street runs east-west along `y = 0`. Three side streets meet it:
/// one from the north at `north_x` and two from the south at `south_left_x` and
/// `south_right_x`. Only the south-right junction is signalled; vehicles from the
/// other side streets yield to main street traffic.
#[derive(Clone, Debug, PartialEq)]
pub struct ThreeTeeLayout {
    /// Half the length of the main street, in m.
    pub main_length: f64,
    /// The length of each side street, in m.
    pub side_length: f64,
    pub north_x: f64,
    pub south_left_x: f64,
    pub south_right_x: f64,
    /// Mean arrivals per tick of `main_E`, `main_W`, `north_center`, `south_left` and
    /// `south_right`.
    pub rates: [f64; 5],
    /// The share of main street vehicles driving straight through.
    pub main_straight: f64,
    /// The share of side street vehicles turning west onto the main street.
    pub side_to_west: f64,
    /// Green time of the main street group at the signal, in ticks.
    pub main_green: (u32, u32, u32),
    /// Green time of the side street group at the signal, in ticks.
    pub side_green: (u32, u32, u32),
    /// The trigger radius of right turns, in m.
    pub right_trigger: f64,
    /// The trigger radius of left turns, in m.
    pub left_trigger: f64,
}

impl Default for ThreeTeeLayout {
    fn default() -> Self {
        Self {
            main_length: 120.0,
            side_length: 120.0,
            north_x: 0.0,
            south_left_x: -40.0,
            south_right_x: 50.0,
            rates: [0.06, 0.06, 0.04, 0.04, 0.04],
            main_straight: 0.6,
            side_to_west: 0.5,
            // (green, min_green, max_green)
            main_green: (25, 10, 40),
            side_green: (15, 8, 25),
            right_trigger: 6.0,
            left_trigger: 9.0,
        }
    }
}

/// The layout of a single signalled four-way crossroads centred on the origin.
#[derive(Clone, Debug, PartialEq)]
pub struct CrossroadsLayout {
    /// The length of each arm, in m.
    pub arm_length: f64,
    /// Mean arrivals per tick of each approach.
    pub rate: f64,
    /// The shares of straight, left and right movements.
    pub shares: (f64, f64, f64),
    /// `(green, min_green, max_green)` of both signal groups, in ticks.
    pub green: (u32, u32, u32),
    pub right_trigger: f64,
    pub left_trigger: f64,
}

impl Default for CrossroadsLayout {
    fn default() -> Self {
        Self {
            arm_length: 120.0,
            rate: 0.05,
            shares: (0.6, 0.2, 0.2),
            green: (15, 8, 25),
            right_trigger: 6.0,
            left_trigger: 9.0,
        }
    }
}

fn segment(name: &str, lane_point: Point2d, direction: Vector2d) -> SegmentDesc {
    SegmentDesc {
        name: name.to_owned(),
        lane_point,
        direction,
        stop_line: None,
        yield_to: None,
        arrival: None,
    }
}

fn straight(probability: f64, goal: Point2d) -> MovementDesc {
    MovementDesc {
        turn: Turn::Straight,
        probability,
        goal,
        manoeuvre: None,
    }
}

fn turn(
    turn: Turn,
    probability: f64,
    goal: Point2d,
    intersection: &str,
    trigger_radius: f64,
    exit: &str,
) -> MovementDesc {
    MovementDesc {
        turn,
        probability,
        goal,
        manoeuvre: Some(ManoeuvreDesc {
            intersection: intersection.to_owned(),
            trigger_radius,
            exit: exit.to_owned(),
        }),
    }
}

fn group(segments: &[&str], (green, min_green, max_green): (u32, u32, u32)) -> GroupDesc {
    GroupDesc {
        segments: segments.iter().map(|s| s.to_string()).collect(),
        green,
        min_green,
        max_green,
    }
}

fn yield_at(intersection: &str, priority: &[&str]) -> Option<YieldDesc> {
    Some(YieldDesc {
        intersection: intersection.to_owned(),
        priority: priority.iter().map(|s| s.to_string()).collect(),
    })
}

/// Builds the three T-junction reference network.
pub fn three_tee(layout: &ThreeTeeLayout, geometry: &Geometry) -> NetworkDesc {
    let l = layout.main_length;
    let v = layout.side_length;
    let q = 0.25 * geometry.lane_width;
    let s = 0.5 * geometry.intersection_radius;
    let (n, sl, sr) = (layout.north_x, layout.south_left_x, layout.south_right_x);
    let (rt, lt) = (layout.right_trigger, layout.left_trigger);

    let east = Vector2d::new(1.0, 0.0);
    let west = Vector2d::new(-1.0, 0.0);
    let north = Vector2d::new(0.0, 1.0);
    let south = Vector2d::new(0.0, -1.0);

    // Goals at the far end of each destination
    let west_end = Point2d::new(-l, q);
    let east_end = Point2d::new(l, -q);

    let p_main = layout.main_straight;
    let p_west = layout.side_to_west;

    let mut main_e = segment("main_E", Point2d::new(l, q), west);
    main_e.stop_line = Some(Point2d::new(sr + s, 0.0));
    main_e.arrival = Some(ArrivalDesc {
        rate: layout.rates[0],
        spawn: Point2d::new(l, q),
        movements: vec![
            straight(p_main, west_end),
            turn(Turn::Right, 1.0 - p_main, Point2d::new(n + q, v), "north", rt, "north_out"),
        ],
    });

    let mut main_w = segment("main_W", Point2d::new(-l, -q), east);
    main_w.stop_line = Some(Point2d::new(sr - s, 0.0));
    main_w.arrival = Some(ArrivalDesc {
        rate: layout.rates[1],
        spawn: Point2d::new(-l, -q),
        movements: vec![
            straight(p_main, east_end),
            turn(
                Turn::Right,
                0.5 * (1.0 - p_main),
                Point2d::new(sl - q, -v),
                "south_left",
                rt,
                "south_left_out",
            ),
            turn(
                Turn::Right,
                0.5 * (1.0 - p_main),
                Point2d::new(sr - q, -v),
                "south_right",
                rt,
                "south_right_out",
            ),
        ],
    });

    // Side streets spawn a little beyond their nominal length
    let side_spawn = v + 10.0;

    let mut north_center = segment("north_center", Point2d::new(n - q, side_spawn), south);
    north_center.stop_line = Some(Point2d::new(n, s));
    north_center.yield_to = yield_at("north", &["main_E", "main_W"]);
    north_center.arrival = Some(ArrivalDesc {
        rate: layout.rates[2],
        spawn: Point2d::new(n - q, side_spawn),
        movements: vec![
            turn(Turn::Right, p_west, west_end, "north", rt, "main_E"),
            turn(Turn::Left, 1.0 - p_west, east_end, "north", lt, "main_W"),
        ],
    });

    let side_from_south = |name: &str, x: f64, rate: f64| {
        let mut seg = segment(name, Point2d::new(x + q, -side_spawn), north);
        seg.stop_line = Some(Point2d::new(x, -s));
        seg.arrival = Some(ArrivalDesc {
            rate,
            spawn: Point2d::new(x + q, -side_spawn),
            movements: vec![
                turn(Turn::Left, p_west, west_end, name, lt, "main_E"),
                turn(Turn::Right, 1.0 - p_west, east_end, name, rt, "main_W"),
            ],
        });
        seg
    };
    let mut south_left = side_from_south("south_left", sl, layout.rates[3]);
    south_left.yield_to = yield_at("south_left", &["main_E", "main_W"]);
    let south_right = side_from_south("south_right", sr, layout.rates[4]);

    NetworkDesc {
        intersections: vec![
            IntersectionDesc {
                name: "north".into(),
                centre: Point2d::new(n, 0.0),
                signal: None,
            },
            IntersectionDesc {
                name: "south_left".into(),
                centre: Point2d::new(sl, 0.0),
                signal: None,
            },
            IntersectionDesc {
                name: "south_right".into(),
                centre: Point2d::new(sr, 0.0),
                signal: Some(vec![
                    group(&["main_E", "main_W"], layout.main_green),
                    group(&["south_right"], layout.side_green),
                ]),
            },
        ],
        segments: vec![
            main_e,
            main_w,
            north_center,
            south_left,
            south_right,
            segment("north_out", Point2d::new(n + q, 0.0), north),
            segment("south_left_out", Point2d::new(sl - q, 0.0), south),
            segment("south_right_out", Point2d::new(sr - q, 0.0), south),
        ],
    }
}

/// Builds a signalled four-way crossroads, with north-south and east-west groups.
pub fn crossroads(layout: &CrossroadsLayout, geometry: &Geometry) -> NetworkDesc {
    let l = layout.arm_length;
    let q = 0.25 * geometry.lane_width;
    let s = 0.5 * geometry.intersection_radius;
    let (p_straight, p_left, p_right) = layout.shares;
    let (rt, lt) = (layout.right_trigger, layout.left_trigger);

    // Lanes leaving the junction towards each compass point
    let north_out = segment("north_out", Point2d::new(q, 0.0), Vector2d::new(0.0, 1.0));
    let south_out = segment("south_out", Point2d::new(-q, 0.0), Vector2d::new(0.0, -1.0));
    let east_out = segment("east_out", Point2d::new(0.0, -q), Vector2d::new(1.0, 0.0));
    let west_out = segment("west_out", Point2d::new(0.0, q), Vector2d::new(-1.0, 0.0));

    let north_goal = Point2d::new(q, l);
    let south_goal = Point2d::new(-q, -l);
    let east_goal = Point2d::new(l, -q);
    let west_goal = Point2d::new(-l, q);

    // (name, spawn, heading, stop line, straight goal, left exit, right exit)
    let arms = [
        (
            "north",
            Point2d::new(-q, l),
            Vector2d::new(0.0, -1.0),
            Point2d::new(0.0, s),
            south_goal,
            ("east_out", east_goal),
            ("west_out", west_goal),
        ),
        (
            "south",
            Point2d::new(q, -l),
            Vector2d::new(0.0, 1.0),
            Point2d::new(0.0, -s),
            north_goal,
            ("west_out", west_goal),
            ("east_out", east_goal),
        ),
        (
            "east",
            Point2d::new(l, q),
            Vector2d::new(-1.0, 0.0),
            Point2d::new(s, 0.0),
            west_goal,
            ("south_out", south_goal),
            ("north_out", north_goal),
        ),
        (
            "west",
            Point2d::new(-l, -q),
            Vector2d::new(1.0, 0.0),
            Point2d::new(-s, 0.0),
            east_goal,
            ("north_out", north_goal),
            ("south_out", south_goal),
        ),
    ];

    let mut segments: Vec<SegmentDesc> = arms
        .iter()
        .map(|(name, spawn, dir, stop, ahead, left, right)| {
            let mut seg = segment(name, *spawn, *dir);
            seg.stop_line = Some(*stop);
            seg.arrival = Some(ArrivalDesc {
                rate: layout.rate,
                spawn: *spawn,
                movements: vec![
                    straight(p_straight, *ahead),
                    turn(Turn::Left, p_left, left.1, "centre", lt, left.0),
                    turn(Turn::Right, p_right, right.1, "centre", rt, right.0),
                ],
            });
            seg
        })
        .collect();
    segments.extend([north_out, south_out, east_out, west_out]);

    NetworkDesc {
        intersections: vec![IntersectionDesc {
            name: "centre".into(),
            centre: Point2d::new(0.0, 0.0),
            signal: Some(vec![
                group(&["north", "south"], layout.green),
                group(&["east", "west"], layout.green),
            ]),
        }],
        segments,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::network::Network;
    use crate::params::Parameters;
    use cgmath::prelude::*;

    #[test]
    fn three_tee_compiles() {
        let params = Parameters::default();
        let desc = three_tee(&ThreeTeeLayout::default(), &params.geometry);
        let network = Network::compile(&desc, &params).unwrap();
        let names: Vec<_> = network.iter_approaches().map(|(_, s, _)| s.name()).collect();
        assert_eq!(
            names,
            ["main_E", "main_W", "north_center", "south_left", "south_right"]
        );
    }

    #[test]
    fn crossroads_compiles() {
        let params = Parameters::default();
        let desc = crossroads(&CrossroadsLayout::default(), &params.geometry);
        let network = Network::compile(&desc, &params).unwrap();
        assert_eq!(network.iter_approaches().count(), 4);
        let centre = network.intersection_id("centre").unwrap();
        assert_eq!(network.intersection(centre).signal().unwrap().groups.len(), 2);
    }

    #[test]
    fn goals_lie_on_exit_lanes() {
        let params = Parameters::default();
        let desc = crossroads(&CrossroadsLayout::default(), &params.geometry);
        let network = Network::compile(&desc, &params).unwrap();
        for (_, _, arrival) in network.iter_approaches() {
            for m in arrival.movements.iter().filter_map(|m| m.manoeuvre.map(|man| (m.goal, man))) {
                let (goal, man) = m;
                let lane = network.segment(man.exit).lane();
                assert!(lane.lateral_offset(goal).abs() < 1e-9);
                assert!(lane.dir.dot(goal - lane.point) > 0.0);
            }
        }
    }
}
