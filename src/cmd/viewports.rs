//! Viewport preset listing (`livepreview viewports`).

use console::style;
use livepreview::preview::viewport::ViewportPreset;

pub fn cmd_viewports() {
    println!("{}", style("Viewport presets").bold());
    for preset in ViewportPreset::ALL {
        let dims = preset.dimensions();
        let marker = if preset == ViewportPreset::default() {
            " (default)"
        } else {
            ""
        };
        println!(
            "  {:<8} {:>5} x {:<5}{}",
            preset.as_str(),
            dims.width,
            dims.height,
            marker
        );
    }
}
