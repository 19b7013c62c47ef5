use approx::assert_relative_eq;
use collidable::*;

fn manager_with(shape: ShapeDef) -> (CollisionManager<()>, CollidableId) {
    let mut manager = CollisionManager::default();
    let id = manager.spawn((), shape);
    (manager, id)
}

fn square(side: f32) -> Vec<Vec2> {
    vec![
        Vec2::new(0.0, 0.0),
        Vec2::new(side, 0.0),
        Vec2::new(side, side),
        Vec2::new(0.0, side),
    ]
}

#[test]
fn entities_start_without_a_body_and_report_defaults() {
    let mut manager = CollisionManager::<()>::default();
    let id = manager.insert(());
    let mut entity = manager.get_mut(id).unwrap();

    assert!(!entity.has_body());
    assert!(!entity.physics_enabled());
    assert!(!entity.static_physics());
    entity.set_position(Vec2::new(10.0, 10.0));
    entity.set_velocity(Vec2::ONE);
    entity.apply_impulse(Vec2::ZERO, Vec2::ONE);

    assert_eq!(entity.position(), Vec2::ZERO);
    assert_eq!(entity.rotation(), 0.0);
    assert_eq!(entity.velocity(), Vec2::ZERO);
    assert_eq!(entity.angular_velocity(), 0.0);
    assert!(entity.collision_shape().is_empty());
    assert_eq!(entity.view().to_world_space(Vec2::ONE), Vec2::ZERO);
}

#[test]
fn kinematic_state_round_trips_through_display_units() {
    let (mut manager, id) = manager_with(ShapeDef::Circle { radius: 10.0 });
    let mut entity = manager.get_mut(id).unwrap();

    entity.set_position(Vec2::new(12.5, -40.0));
    entity.set_rotation(135.0);
    entity.set_velocity(Vec2::new(30.0, -10.0));
    entity.set_angular_velocity(45.0);

    assert_relative_eq!(entity.position().x, 12.5, epsilon = 1e-4);
    assert_relative_eq!(entity.position().y, -40.0, epsilon = 1e-4);
    assert_relative_eq!(entity.rotation(), 135.0, epsilon = 1e-3);
    assert_relative_eq!(entity.velocity().x, 30.0, epsilon = 1e-4);
    assert_relative_eq!(entity.velocity().y, -10.0, epsilon = 1e-4);
    assert_relative_eq!(entity.angular_velocity(), 45.0, epsilon = 1e-3);

    // Setting one half of the pose keeps the other.
    entity.set_position(Vec2::new(1.0, 2.0));
    assert_relative_eq!(entity.rotation(), 135.0, epsilon = 1e-3);
}

#[test]
fn rotation_is_not_wrapped() {
    let (mut manager, id) = manager_with(ShapeDef::Circle { radius: 10.0 });
    let mut entity = manager.get_mut(id).unwrap();
    entity.set_rotation(450.0);
    assert_relative_eq!(entity.rotation(), 450.0, epsilon = 1e-3);
    entity.set_rotation(-720.0);
    assert_relative_eq!(entity.rotation(), -720.0, epsilon = 1e-3);
}

#[test]
fn local_and_world_space_follow_the_body_pose() {
    let (mut manager, id) = manager_with(ShapeDef::Circle { radius: 10.0 });
    let mut entity = manager.get_mut(id).unwrap();
    entity.set_position(Vec2::new(100.0, 0.0));
    entity.set_rotation(90.0);

    let view = entity.view();
    let world = view.to_world_space(Vec2::new(10.0, 0.0));
    assert_relative_eq!(world.x, 100.0, epsilon = 1e-3);
    assert_relative_eq!(world.y, 10.0, epsilon = 1e-3);

    let local = view.to_local_space(Vec2::new(100.0, 10.0));
    assert_relative_eq!(local.x, 10.0, epsilon = 1e-3);
    assert_relative_eq!(local.y, 0.0, epsilon = 1e-3);
}

#[test]
fn impulses_are_scaled_and_only_move_dynamic_bodies() {
    let (mut manager, id) = manager_with(ShapeDef::Circle { radius: 10.0 });
    let body = manager.get(id).unwrap().body().unwrap();
    let mass = manager.world().body(body).unwrap().mass();
    assert_relative_eq!(mass, std::f32::consts::PI * 0.25, epsilon = 1e-4);

    let mut entity = manager.get_mut(id).unwrap();
    entity.apply_impulse(Vec2::ZERO, Vec2::new(20.0, 0.0));
    assert_relative_eq!(entity.velocity().x, 20.0 / mass, epsilon = 1e-3);
    assert_relative_eq!(entity.angular_velocity(), 0.0, epsilon = 1e-4);

    entity.set_physics_mode(false, true);
    entity.set_velocity(Vec2::ZERO);
    entity.apply_impulse(Vec2::ZERO, Vec2::new(20.0, 0.0));
    assert_eq!(entity.velocity(), Vec2::ZERO);
}

#[test]
fn circle_shape_reports_thirty_two_points() {
    let (manager, id) = manager_with(ShapeDef::Circle { radius: 10.0 });
    let shape = manager.get(id).unwrap().collision_shape();
    assert_eq!(shape.len(), 32);
    assert_relative_eq!(shape[0].x, 0.0, epsilon = 1e-4);
    assert_relative_eq!(shape[0].y, 10.0, epsilon = 1e-4);
    assert_relative_eq!(shape[8].x, 10.0, epsilon = 1e-4);
    for point in shape {
        assert_relative_eq!(point.length(), 10.0, epsilon = 1e-3);
    }
}

#[test]
fn box_shape_is_centred_on_its_origin() {
    let (manager, id) = manager_with(ShapeDef::Box {
        size: Vec2::new(40.0, 20.0),
        origin: Vec2::new(10.0, 0.0),
    });
    let shape = manager.get(id).unwrap().collision_shape();
    assert_eq!(shape.len(), 4);
    for expected in [
        Vec2::new(-10.0, -10.0),
        Vec2::new(30.0, -10.0),
        Vec2::new(30.0, 10.0),
        Vec2::new(-10.0, 10.0),
    ] {
        assert!(
            shape.iter().any(|p| p.distance(expected) < 1e-3),
            "missing corner {expected:?} in {shape:?}"
        );
    }
}

#[test]
fn polygon_shape_returns_its_vertices_in_display_units() {
    let points = square(20.0);
    let (manager, id) = manager_with(ShapeDef::Polygon(points.clone()));
    let shape = manager.get(id).unwrap().collision_shape();
    assert_eq!(shape.len(), points.len());
    for (got, expected) in shape.iter().zip(&points) {
        assert_relative_eq!(got.x, expected.x, epsilon = 1e-3);
        assert_relative_eq!(got.y, expected.y, epsilon = 1e-3);
    }
}

#[test]
fn clockwise_polygons_keep_their_anchor_first() {
    let mut points = square(20.0);
    points[1..].reverse();
    let (manager, id) = manager_with(ShapeDef::Polygon(points.clone()));
    let entity = manager.get(id).unwrap();
    assert!(!entity.is_destroyed());

    let shape = entity.collision_shape();
    assert_relative_eq!(shape[0].x, points[0].x, epsilon = 1e-3);
    assert_relative_eq!(shape[0].y, points[0].y, epsilon = 1e-3);
    for p in &points {
        assert!(shape.iter().any(|q| q.distance(*p) < 1e-3));
    }
}

#[test]
fn long_chains_become_fans_anchored_at_the_first_point() {
    let outline: Vec<Vec2> = (0..20)
        .map(|i| {
            let angle = i as f32 / 20.0 * std::f32::consts::TAU;
            Vec2::new(angle.cos(), angle.sin()) * 100.0
        })
        .collect();
    let (manager, id) = manager_with(ShapeDef::Polygon(outline.clone()));
    let entity = manager.get(id).unwrap();
    let outlines = entity.collision_outlines();

    assert_eq!(outlines.len(), partition_fan(&outline, 8).len());
    assert_eq!(outlines.len(), 3);
    for fixture in &outlines {
        assert!(fixture.len() <= 8);
        assert!(fixture[0].distance(outline[0]) < 1e-3);
    }
    assert!(!entity.is_destroyed());
}

#[test]
fn short_chains_leave_the_existing_body_alone() {
    let (mut manager, id) = manager_with(ShapeDef::Circle { radius: 10.0 });
    let body = manager.get(id).unwrap().body();

    let mut entity = manager.get_mut(id).unwrap();
    entity.set_polygon(&[Vec2::ZERO, Vec2::new(10.0, 0.0)]);
    assert_eq!(entity.body(), body);
    assert_eq!(entity.collision_shape().len(), 32);
}

#[test]
fn invalid_polygons_fall_back_to_a_tiny_box_and_destroy_the_entity() {
    let arrow = vec![
        Vec2::new(0.0, 0.0),
        Vec2::new(40.0, 0.0),
        Vec2::new(10.0, 10.0),
        Vec2::new(0.0, 40.0),
    ];
    let (manager, id) = manager_with(ShapeDef::Polygon(arrow));
    let entity = manager.get(id).unwrap();

    assert!(entity.is_destroyed());
    assert!(entity.has_body());
    let shape = entity.collision_shape();
    assert_eq!(shape.len(), 4);
    for p in shape {
        assert_relative_eq!(p.x.abs(), 1.0, epsilon = 1e-4);
        assert_relative_eq!(p.y.abs(), 1.0, epsilon = 1e-4);
    }
}

#[test]
fn reshaping_replaces_fixtures_on_the_same_body() {
    let (mut manager, id) = manager_with(ShapeDef::Circle { radius: 10.0 });
    let body = manager.get(id).unwrap().body();
    manager.get_mut(id).unwrap().set_position(Vec2::new(60.0, 0.0));

    manager
        .get_mut(id)
        .unwrap()
        .set_box(Vec2::new(10.0, 10.0), Vec2::ZERO);

    let entity = manager.get(id).unwrap();
    assert_eq!(entity.body(), body);
    assert_eq!(entity.collision_outlines().len(), 1);
    assert_eq!(entity.collision_shape().len(), 4);
    assert_relative_eq!(entity.position().x, 60.0, epsilon = 1e-4);
    assert_eq!(manager.world().collider_count(), 1);
}

#[test]
fn new_bodies_follow_the_entity_physics_mode() {
    let mut manager = CollisionManager::<()>::default();
    let id = manager.insert(());
    manager.get_mut(id).unwrap().set_physics_mode(true, true);
    manager.get_mut(id).unwrap().set_circle(5.0);

    let body_handle = manager.get(id).unwrap().body().unwrap();
    let world = manager.world();
    let body = world.body(body_handle).unwrap();
    assert_eq!(body.body_type(), BodyType::Kinematic);
    assert!(!body.allows_sleep());
    assert_eq!(body.user_data, Some(id.to_bits()));

    let collider = world.collider(body.colliders()[0]).unwrap();
    assert!(!collider.is_sensor);
    assert_relative_eq!(collider.material.friction, 0.1);
    assert_relative_eq!(collider.material.density, 1.0);
    assert_relative_eq!(collider.material.restitution, 0.0);
}

#[test]
fn physics_mode_switches_existing_fixtures() {
    let (mut manager, id) = manager_with(ShapeDef::Polygon(
        (0..12)
            .map(|i| {
                let angle = i as f32 / 12.0 * std::f32::consts::TAU;
                Vec2::new(angle.cos(), angle.sin()) * 30.0
            })
            .collect(),
    ));
    manager.get_mut(id).unwrap().set_physics_mode(true, true);

    let body_handle = manager.get(id).unwrap().body().unwrap();
    let world = manager.world();
    let body = world.body(body_handle).unwrap();
    assert_eq!(body.body_type(), BodyType::Kinematic);
    assert_eq!(body.colliders().len(), 2);
    for handle in body.colliders() {
        assert!(!world.collider(*handle).unwrap().is_sensor);
    }

    manager.get_mut(id).unwrap().set_physics_mode(false, false);
    let world = manager.world();
    let body = world.body(body_handle).unwrap();
    assert_eq!(body.body_type(), BodyType::Dynamic);
    assert!(body
        .colliders()
        .iter()
        .all(|handle| world.collider(*handle).unwrap().is_sensor));
}
