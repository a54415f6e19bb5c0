use std::time::Duration;

use console::Style;
use panoview_core::loader::LoadedImage;
use panoview_core::texture::TilePlan;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    disabled: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
        }
    }

    fn title(&self, text: &str) {
        println!();
        println!("  {}", self.title.apply_to(text));
        println!("  {}", self.title.apply_to("\u{2550}".repeat(text.chars().count())));
        println!();
    }
}

pub fn print_tile_plan(
    source: &str,
    (width, height): (u32, u32),
    tile_size: u32,
    max_dimension: u32,
    device: &str,
    plan: &TilePlan,
    list_regions: bool,
) {
    let s = Styles::new();
    s.title("Tile Plan");

    println!("  {:<14}{}", s.label.apply_to("Source"), s.path.apply_to(source));
    println!(
        "  {:<14}{}",
        s.label.apply_to("Size"),
        s.value.apply_to(format!("{width}x{height}"))
    );
    println!("  {:<14}{}", s.label.apply_to("Tile size"), s.value.apply_to(tile_size));
    println!(
        "  {:<14}{} {}",
        s.label.apply_to("Max texture"),
        s.value.apply_to(max_dimension),
        s.label.apply_to(format!("({device})"))
    );

    if plan.regions.len() == 1 {
        println!(
            "  {:<14}{}",
            s.label.apply_to("Tiles"),
            s.disabled.apply_to("single texture, no tiling")
        );
    } else {
        println!(
            "  {:<14}{}",
            s.label.apply_to("Tiles"),
            s.method.apply_to(format!(
                "{} ({} columns x {} rows)",
                plan.regions.len(),
                plan.columns,
                plan.rows
            ))
        );
    }

    if list_regions {
        println!();
        println!("  {}", s.header.apply_to("Regions"));
        for (i, region) in plan.regions.iter().enumerate() {
            let (l, t, r, b) = region.display_bounds();
            println!(
                "    {:<12}{} {}",
                s.label.apply_to(format!("#{i}")),
                s.value.apply_to(format!(
                    "{}x{} at [{}, {}]",
                    region.width, region.height, region.left, region.top
                )),
                s.label.apply_to(format!("draws [{l}, {t}] - [{r}, {b}]"))
            );
        }
    }
    println!();
}

pub fn print_load_summary(loaded: &LoadedImage, backend: &str, elapsed: Duration) {
    let s = Styles::new();
    let meta = &loaded.metadata;
    let texture = &loaded.texture;
    s.title("Loaded Image");

    println!("  {:<14}{}", s.label.apply_to("Source"), s.path.apply_to(&meta.source_name));
    println!(
        "  {:<14}{}",
        s.label.apply_to("Upright size"),
        s.value.apply_to(format!("{}x{}", meta.width, meta.height))
    );
    println!("  {:<14}{}", s.label.apply_to("Orientation"), s.value.apply_to(meta.orientation));
    println!("  {:<14}{}", s.label.apply_to("Pixels"), s.value.apply_to(meta.layout));
    if meta.is_360 {
        let pose = match meta.pose {
            Some(pose) => format!(
                "360°, pose {:.1}° / {:.1}° / {:.1}°",
                pose.heading_deg, pose.pitch_deg, pose.roll_deg
            ),
            None => "360°".to_string(),
        };
        println!("  {:<14}{}", s.label.apply_to("Kind"), s.method.apply_to(pose));
    } else {
        println!("  {:<14}{}", s.label.apply_to("Kind"), s.disabled.apply_to("flat"));
    }
    println!();

    println!("  {}", s.header.apply_to("Textures"));
    println!("    {:<12}{}", s.label.apply_to("Backend"), s.method.apply_to(backend));
    let (columns, rows) = texture.grid();
    println!(
        "    {:<12}{}",
        s.label.apply_to("Tiles"),
        s.value.apply_to(format!("{} ({columns} x {rows})", texture.len()))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Ready"),
        s.value.apply_to(format!("{}/{}", texture.ready_count(), texture.len()))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Elapsed"),
        s.value.apply_to(format!("{:.2}s", elapsed.as_secs_f64()))
    );
    println!();
}
