//! Demonstration of a region-centered world map
//!
//! Run with `RUST_LOG=debug` to see generation timings.

use fractal_worldmap::*;

fn main() -> Result<()> {
    env_logger::init();

    println!("Generating world map...");

    let config = WorldConfigBuilder::new()
        .seed(42)
        .map_width(640.0)?
        .map_resolution(10.0)?
        .terrain_lod(6)?
        .build()?;

    let map = WorldMap::generate(config)?;
    let field = map.height_field();
    let (min, max) = field.extent();

    println!("Generator version {}", map.version());
    println!("  Grid: {0}x{0} cells", field.size());
    println!("  Elevation: {:.1} .. {:.1}", min, max);
    println!(
        "  Regions: {} ({} land)",
        map.regions().len(),
        map.regions().land_regions().count()
    );
    println!("  Cities: {}", map.city_count());

    // Terrain, with each city marked by the initial of its name
    println!();
    let size = field.size();
    let mut rows: Vec<Vec<char>> = (0..size)
        .map(|y| {
            (0..size)
                .map(|x| if field.is_land(x, y) { '#' } else { '~' })
                .collect()
        })
        .collect();
    for city in map.cities(None)? {
        if let Some((x, y)) = map.world_to_grid(city.position) {
            rows[y][x] = city.name.chars().next().unwrap_or('*');
        }
    }
    for row in rows {
        println!("{}", row.into_iter().collect::<String>());
    }

    // Area queries
    let middle = Point::splat(map.map_width() / 2.0);
    let near = Shape::Circle(Circle::new(middle, 120.0));
    println!(
        "\nCities within 120 {} of the center:",
        map.distance_unit()
    );
    for (id, city) in map.cities_with_ids(&near)? {
        println!(
            "  #{:<3} {:<12} ({:.0}, {:.0})",
            id, city.name, city.position.x, city.position.y
        );
    }

    let quarter = Shape::Rectangle(Rectangle::new(Point::ZERO, middle));
    println!(
        "Cities in the top-left quarter: {}",
        map.cities(Some(&quarter))?.len()
    );

    Ok(())
}
