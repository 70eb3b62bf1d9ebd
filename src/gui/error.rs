use egui::{Align2, Context, Id, RichText, Window};

pub fn error_dialog(ctx: &Context, id: usize, message: &str, on_dismiss: impl FnOnce()) {
    Window::new("Load failed")
        .id(Id::new("error").with(id).with(message))
        .collapsible(false)
        .resizable([false, false])
        .anchor(Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui| {
            ui.label(RichText::new(message).monospace());
            if ui.button("Dismiss").clicked() {
                on_dismiss()
            }
        });
}
