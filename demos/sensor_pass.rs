use collidable::*;

#[derive(Debug)]
enum Actor {
    Bullet { damage: u32 },
    Target { health: i32 },
}

impl CollisionHandler for Actor {
    fn collision(mut pair: CollisionPair<'_, Self>) {
        let at = pair.other().position();
        let (this, other) = pair.entities();
        let damage = match other.payload() {
            Actor::Bullet { damage } => *damage as i32,
            Actor::Target { .. } => return,
        };
        match this.payload_mut() {
            Actor::Target { health } => {
                *health -= damage;
                println!("target hit at {at:?} for {damage}, health now {health}");
                if *health <= 0 {
                    this.destroy();
                }
            }
            Actor::Bullet { .. } => {}
        }
        // Bullets vanish on their first hit.
        other.destroy();
    }
}

fn main() {
    let mut manager = CollisionManager::new(WorldConfig::default().with_frame_budget(4.0));

    let target = manager.spawn(
        Actor::Target { health: 25 },
        ShapeDef::Polygon(vec![
            Vec2::new(-20.0, -20.0),
            Vec2::new(20.0, -20.0),
            Vec2::new(20.0, 20.0),
            Vec2::new(-20.0, 20.0),
        ]),
    );
    if let Some(mut entity) = manager.get_mut(target) {
        entity.set_physics_mode(false, true);
    }

    for i in 0..3 {
        let bullet = manager.spawn(Actor::Bullet { damage: 10 }, ShapeDef::Circle { radius: 2.0 });
        if let Some(mut entity) = manager.get_mut(bullet) {
            entity.set_position(Vec2::new(-200.0 - 60.0 * i as f32, 0.0));
            entity.set_velocity(Vec2::new(300.0, 0.0));
        }
    }

    for frame in 0..120 {
        manager.step(1.0 / 60.0);
        if manager.get(target).map(|t| !t.has_body()).unwrap_or(true) {
            println!("target removed after {} frames", frame + 1);
            break;
        }
    }
    println!("{} destroyed bodies purged", manager.purge_destroyed());
    manager.world().profile().report();
}
