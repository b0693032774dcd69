use egui::{Align2, Color32, Context, FontId, RichText};

use crate::controller::FrameSnapshot;
use crate::view::UiFrame;

const LABEL_COLOR: Color32 = Color32::from_rgb(40, 44, 52);

/// Build the overlay for one frame and return egui output
pub fn build_ui(egui_ctx: &Context, raw_input: egui::RawInput, snapshot: &FrameSnapshot) -> egui::FullOutput {
    egui_ctx.run(raw_input, |ctx| {
        draw_glyph_labels(ctx, snapshot);
        draw_hud(ctx, snapshot);
    })
}

/// Tessellate egui output into something the renderer can draw
pub fn into_frame(egui_ctx: &Context, output: egui::FullOutput) -> (UiFrame, egui::PlatformOutput) {
    let pixels_per_point = output.pixels_per_point;
    let primitives = egui_ctx.tessellate(output.shapes, pixels_per_point);
    let frame = UiFrame {
        primitives,
        textures_delta: output.textures_delta,
        pixels_per_point,
    };
    (frame, output.platform_output)
}

// Characters sit behind every window, over the 3D scene
fn draw_glyph_labels(ctx: &Context, snapshot: &FrameSnapshot) {
    let painter = ctx.layer_painter(egui::LayerId::new(egui::Order::Background, egui::Id::new("glyph_labels")));
    let ppp = ctx.pixels_per_point();
    for label in &snapshot.labels {
        let size = label.size / ppp;
        if size < 1.0 {
            continue;
        }
        painter.text(
            egui::pos2(label.screen.x / ppp, label.screen.y / ppp),
            Align2::CENTER_CENTER,
            &label.text,
            FontId::proportional(size),
            LABEL_COLOR,
        );
    }
}

fn draw_hud(ctx: &Context, snapshot: &FrameSnapshot) {
    egui::Window::new("glyphfall")
        .default_pos([8.0, 8.0])
        .resizable(false)
        .show(ctx, |ui| {
            ui.label(RichText::new(format!("Glyphs: {} / {}", snapshot.live, snapshot.limit)).small());
            ui.label(RichText::new(format!("FPS: {:.0}", snapshot.fps)).small());
            ui.separator();
            ui.label(RichText::new("Type - Drop a glyph").small());
            ui.label(RichText::new("Backspace - Remove last").small());
            ui.label(RichText::new("Enter - Drop a return glyph").small());
            ui.label(RichText::new("Escape - Clear all").small());
        });
}
