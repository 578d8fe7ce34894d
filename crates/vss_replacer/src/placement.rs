//! Placement geometry (spec.md §4.8): the ball-by-foul table and the
//! per-foul default team frames. Grounded on `replacer.cpp`'s
//! `getBallPlaceByFoul`, `getKickoffPlacement`, `getPenaltyPlacement`,
//! `getGoalKickPlacement`, `getFreeBallPlacement`,
//! `getOutsideFieldPlacement` and `getPenaltyShootoutPlacement`.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use vss_config::Config;
use vss_geometry::{distance, Position, Side};
use vss_messages::{Color, Foul, Frame, Quadrant, Robot};

fn side_of(color: Color, config: &Config) -> Side {
    match color {
        Color::Blue => config.blue_side(),
        Color::Yellow => config.yellow_side(),
        Color::None => Side::Left,
    }
}

/// `L` in spec.md §4.8: the goal-kick x magnitude.
fn l(config: &Config) -> f32 {
    config.field.half_length() - 0.15
}

/// `Mx` in spec.md §4.8: the mark x magnitude.
fn mx(config: &Config) -> f32 {
    config.field.half_length() - 0.375
}

/// `My` in spec.md §4.8: the mark y magnitude.
fn my(config: &Config) -> f32 {
    config.field.half_width() - 0.25
}

/// Robot ids available to fill non-goalie slots, in ascending order.
fn non_goalie_ids(available_players: &[u8], goalie_id: u8) -> Vec<u8> {
    let mut ids: Vec<u8> = available_players
        .iter()
        .copied()
        .filter(|&id| id != goalie_id)
        .collect();
    ids.sort_unstable();
    ids
}

fn robot(id: u8, x: f32, y: f32, orientation_deg: f32) -> Robot {
    Robot {
        id,
        x,
        y,
        orientation_deg,
    }
}

/// The ball position for the given foul (spec.md §4.8's "Ball position
/// by foul" table). `is_goalie_placed_at_top` only matters for
/// `GoalKick`; it is the latched side chosen by
/// [`goal_kick_placement`] for the taking team.
pub fn ball_place_by_foul(
    foul: Foul,
    foul_color: Color,
    quadrant: Quadrant,
    config: &Config,
    is_goalie_placed_at_top: bool,
) -> Position {
    match foul {
        Foul::Kickoff => Position::new(0.0, 0.0),
        Foul::FreeBall => {
            let (x, y) = (mx(config), my(config));
            match quadrant {
                Quadrant::Q1 => Position::new(x, y),
                Quadrant::Q2 => Position::new(-x, y),
                Quadrant::Q3 => Position::new(-x, -y),
                Quadrant::Q4 => Position::new(x, -y),
                Quadrant::NoQuadrant => Position::new(0.0, 0.0),
            }
        }
        Foul::GoalKick => {
            let f = side_of(foul_color, config).sign();
            let y = if is_goalie_placed_at_top {
                0.375 - config.ball_radius_m
            } else {
                -(0.375 - config.ball_radius_m)
            };
            Position::new(f * l(config), y)
        }
        // Preserved verbatim: the source shares FREE_KICK's ball
        // placement with PENALTY_KICK (spec.md §9 open question).
        Foul::PenaltyKick | Foul::FreeKick => {
            let f = side_of(foul_color, config).sign();
            Position::new(-f * mx(config), 0.0)
        }
        _ => Position::new(0.0, 0.0),
    }
}

/// Default kickoff frame (spec.md §4.8 "Kickoff"): GK at the goal
/// line, striker and support stacked toward the center mark.
pub fn kickoff_placement(color: Color, goalie_id: u8, available_players: &[u8], config: &Config) -> Frame {
    let side = side_of(color, config);
    let f = side.sign();
    let r = config.robot_length_m;
    let others = non_goalie_ids(available_players, goalie_id);

    let mut robots = vec![robot(goalie_id, f * (l(config) + 0.15 - r), 0.0, 0.0)];
    if let Some(&striker) = others.first() {
        robots.push(robot(striker, f * config.field.center_radius, 0.0, 0.0));
    }
    if let Some(&support) = others.get(1) {
        robots.push(robot(support, f * 2.0 * config.field.center_radius, 0.0, 0.0));
    }

    Frame {
        team_color: color,
        robots,
    }
}

/// Default penalty frame (spec.md §4.8 "Penalty"): a different
/// formation for the kicking team (`color == foul_color`) than for
/// the defending team.
pub fn penalty_placement(
    color: Color,
    foul_color: Color,
    goalie_id: u8,
    available_players: &[u8],
    config: &Config,
) -> Frame {
    let side = side_of(color, config);
    let f = side.sign();
    let r = config.robot_length_m;
    let my = my(config);
    let mx = mx(config);
    let others = non_goalie_ids(available_players, goalie_id);

    let mut robots = Vec::with_capacity(3);
    if color == foul_color {
        robots.push(robot(goalie_id, f * (l(config) + 0.15 - r), 0.0, 0.0));
        if let Some(&striker) = others.first() {
            robots.push(robot(striker, -f * (mx - 2.0 * r), 0.0, 0.0));
        }
        if let Some(&support) = others.get(1) {
            robots.push(robot(support, f * 1.5 * r, my, 0.0));
        }
    } else {
        robots.push(robot(goalie_id, f * (l(config) + 0.15 - r / 2.0), 0.0, 0.0));
        if let Some(&striker) = others.first() {
            robots.push(robot(striker, -f * 1.5 * r, -my, 0.0));
        }
        if let Some(&support) = others.get(1) {
            robots.push(robot(support, -f * 1.5 * r, my - 2.0 * r, 0.0));
        }
    }

    Frame {
        team_color: color,
        robots,
    }
}

/// Default goal-kick frame (spec.md §4.8 "Goal-kick"). For the taking
/// team this also decides `_isGoaliePlacedAtTop` by a coin flip of
/// `rng`, returned so the caller can latch it for the ball placement
/// and the opposing GK mirror.
pub fn goal_kick_placement(
    color: Color,
    foul_color: Color,
    goalie_id: u8,
    available_players: &[u8],
    config: &Config,
    rng: &mut ChaCha8Rng,
) -> (Frame, Option<bool>) {
    let side = side_of(color, config);
    let f = side.sign();
    let r = config.robot_length_m;
    let my = my(config);
    let mx = mx(config);
    let others = non_goalie_ids(available_players, goalie_id);

    if color == foul_color {
        let is_goalie_placed_at_top: bool = rng.random();
        let gk_y = if is_goalie_placed_at_top { 0.270 } else { -0.270 };
        let gk_orientation = if is_goalie_placed_at_top { -f * 45.0 } else { f * 45.0 };

        let mut robots = vec![robot(goalie_id, f * 0.675, gk_y, gk_orientation)];
        if let Some(&striker) = others.first() {
            robots.push(robot(striker, f * (mx + r), my - r, 0.0));
        }
        if let Some(&support) = others.get(1) {
            robots.push(robot(support, f * (mx - r), -my - r, 0.0));
        }

        (
            Frame {
                team_color: color,
                robots,
            },
            Some(is_goalie_placed_at_top),
        )
    } else {
        let mut robots = vec![robot(goalie_id, f * (l(config) + 0.15 - r), 0.0, 0.0)];
        if let Some(&striker) = others.first() {
            robots.push(robot(striker, -f * (mx - 2.0 * r), my - 4.0 * r, 0.0));
        }
        if let Some(&support) = others.get(1) {
            robots.push(robot(support, -f * (mx - 3.0 * r), -my + r, 0.0));
        }

        (
            Frame {
                team_color: color,
                robots,
            },
            None,
        )
    }
}

/// Whether `quadrant` sits on the same field half (by x sign) as `side`.
fn quadrant_on_side(quadrant: Quadrant, side: Side) -> bool {
    match (side, quadrant) {
        (Side::Left, Quadrant::Q2 | Quadrant::Q3) => true,
        (Side::Right, Quadrant::Q1 | Quadrant::Q4) => true,
        _ => false,
    }
}

/// The free-ball mark, signed by `foul_quadrant` (not by team side),
/// matching `getFreeBallPlacement`'s `markX`/`markY` sign flips.
fn signed_mark(foul_quadrant: Quadrant, config: &Config) -> (f32, f32) {
    let x = match foul_quadrant {
        Quadrant::Q2 | Quadrant::Q3 => -mx(config),
        _ => mx(config),
    };
    let y = match foul_quadrant {
        Quadrant::Q3 | Quadrant::Q4 => -my(config),
        _ => my(config),
    };
    (x, y)
}

/// Default free-ball frame (spec.md §4.8 "Free-ball"): GK nudges
/// `±robotLength` off the goal line when the foul quadrant is adjacent
/// to its own side; striker and support sit at the per-side,
/// per-quadrant table ported from `getFreeBallPlacement`.
pub fn free_ball_placement(
    color: Color,
    foul_quadrant: Quadrant,
    goalie_id: u8,
    available_players: &[u8],
    config: &Config,
) -> Frame {
    let side = side_of(color, config);
    let f = side.sign();
    let r = config.robot_length_m;
    let others = non_goalie_ids(available_players, goalie_id);
    let (mark_x, mark_y) = signed_mark(foul_quadrant, config);

    let gk_y = if quadrant_on_side(foul_quadrant, side) {
        match foul_quadrant {
            Quadrant::Q1 | Quadrant::Q2 => r,
            Quadrant::Q3 | Quadrant::Q4 => -r,
            Quadrant::NoQuadrant => 0.0,
        }
    } else {
        0.0
    };

    let mut robots = vec![robot(goalie_id, f * (l(config) + 0.15 - r), gk_y, 0.0)];

    if let Some(&striker) = others.first() {
        let striker_x = match side {
            Side::Left => mark_x - 0.2,
            Side::Right => mark_x + 0.2,
        };
        robots.push(robot(striker, striker_x, mark_y, 0.0));
    }

    if let Some(&support) = others.get(1) {
        let (support_x, support_y) = match (side, foul_quadrant) {
            (Side::Left, Quadrant::Q1) => (0.1, -0.2),
            (Side::Left, Quadrant::Q2) => (-0.3, -0.1),
            (Side::Left, Quadrant::Q3) => (-0.3, 0.1),
            (Side::Left, Quadrant::Q4) => (0.1, 0.2),
            (Side::Right, Quadrant::Q1) => (0.3, -0.1),
            (Side::Right, Quadrant::Q2) => (-0.1, -0.2),
            (Side::Right, Quadrant::Q3) => (-0.1, 0.2),
            (Side::Right, Quadrant::Q4) => (0.3, 0.1),
            (_, Quadrant::NoQuadrant) => (0.0, 0.0),
        };
        robots.push(robot(support, support_x, support_y, 0.0));
    }

    Frame {
        team_color: color,
        robots,
    }
}

/// Removed-from-play parking spot for non-kicking robots during
/// kickoff (spec.md §4.8 "Outside-field"): the kickoff x formation at
/// `y = -0.8`, per `getOutsideFieldPlacement` — structurally identical
/// to [`kickoff_placement`] but with the robots parked off the field.
pub fn outside_field_placement(color: Color, goalie_id: u8, available_players: &[u8], config: &Config) -> Frame {
    let side = side_of(color, config);
    let f = side.sign();
    let r = config.robot_length_m;
    let others = non_goalie_ids(available_players, goalie_id);

    let mut robots = vec![robot(goalie_id, f * (l(config) + 0.15 - r), -0.8, 0.0)];
    if let Some(&striker) = others.first() {
        robots.push(robot(striker, f * config.field.center_radius, -0.8, 0.0));
    }
    if let Some(&support) = others.get(1) {
        robots.push(robot(support, f * 2.0 * config.field.center_radius, -0.8, 0.0));
    }

    Frame {
        team_color: color,
        robots,
    }
}

/// Finds the penalty-shootout attacker: the robot in the attacking
/// team's last proposed frame nearest the future ball spot (spec.md
/// §4.8's "Closest-player selection").
pub fn select_penalty_shootout_attacker(attacker_color: Color, attacker_last_frame: &Frame, config: &Config) -> Option<u8> {
    let future_ball = ball_place_by_foul(Foul::PenaltyKick, attacker_color, Quadrant::NoQuadrant, config, false);

    attacker_last_frame
        .robots
        .iter()
        .min_by(|a, b| {
            let da = distance(Position::new(a.x, a.y), future_ball);
            let db = distance(Position::new(b.x, b.y), future_ball);
            da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|r| r.id)
}

/// Finds the penalty-shootout keeper: the sole robot in the
/// defending team's last proposed frame already inside its own goal
/// area (spec.md §4.8's "Closest-player selection").
pub fn select_penalty_shootout_keeper(defender_side: Side, defender_last_frame: &Frame, config: &Config) -> Option<u8> {
    defender_last_frame
        .robots
        .iter()
        .find(|r| vss_geometry::is_inside_goal_area(defender_side, Position::new(r.x, r.y), &config.field))
        .map(|r| r.id)
}

/// Selects both penalty-shootout actors in one call: the attacking
/// team's shooter and the defending team's keeper.
pub fn select_penalty_shootout_actors(
    attacker_color: Color,
    attacker_last_frame: &Frame,
    defender_side: Side,
    defender_last_frame: &Frame,
    config: &Config,
) -> (Option<u8>, Option<u8>) {
    (
        select_penalty_shootout_attacker(attacker_color, attacker_last_frame, config),
        select_penalty_shootout_keeper(defender_side, defender_last_frame, config),
    )
}

/// Two non-actor robots parked off-field during a penalty shootout
/// (spec.md §4.8 "Penalty shootout, non-actors"), excluding whichever
/// robot was selected to take the kick or keep goal.
pub fn penalty_shootout_placement(color: Color, excluded_id: Option<u8>, available_players: &[u8], config: &Config) -> Frame {
    let f = side_of(color, config).sign();
    let mut ids: Vec<u8> = available_players
        .iter()
        .copied()
        .filter(|&id| Some(id) != excluded_id)
        .collect();
    ids.sort_unstable();

    let robots = ids
        .into_iter()
        .take(2)
        .enumerate()
        .map(|(index, id)| robot(id, f * 0.1 * (index as f32 + 1.0), -0.8, 0.0))
        .collect();

    Frame {
        team_color: color,
        robots,
    }
}
