//! Demonstration of polar city placement

use fractal_worldmap::*;

fn main() -> Result<()> {
    env_logger::init();

    let polar = PolarConfig::new(4, 3, 1.5);
    let config = WorldConfigBuilder::new()
        .seed(7)
        .terrain_lod(4)?
        .polar(polar)?
        .build()?;

    let mut map = WorldMap::generate(config)?;

    println!("Polar map with {} cities", map.city_count());
    for ring in 0..=polar.steps {
        println!(
            "  Ring {}: {} arms at radius {:.0}",
            ring,
            polar.arms_at(ring),
            polar.radius_at(ring)
        );
    }
    println!("  Roads: {}", map.roads().len());
    println!("  Section borders: {}", map.sections().len());
    println!("  Bounding radius: {:.1}", map.bounding_radius().unwrap_or(0.0));

    // A far outpost grows the map and rebuilds the index
    let outpost = map.add_city(City::with_parent("Outpost", Point::new(600.0, 0.0), 1))?;
    println!(
        "\nAdded city #{}; bounding radius is now {:.1} (index depth {})",
        outpost,
        map.bounding_radius().unwrap_or(0.0),
        map.index().depth()
    );

    let inner = Shape::Circle(Circle::new(Point::ZERO, polar.radius_at(1) + 1.0));
    println!("\nCenter and first ring:");
    for city in map.cities(Some(&inner))? {
        println!("  {:<12} ({:>7.1}, {:>7.1})", city.name, city.position.x, city.position.y);
    }

    Ok(())
}
