//! GTK Host - Renders wizard steps with GTK4/Libadwaita
//!
//! ARCHITECTURE: every step view is turned into a widget page inside a
//! `gtk::Stack`. Widget signals do not touch steps directly; they go through
//! the `WizardSlot` to the active step, which posts the work onto the UI loop.
//! The loop itself is pumped from `glib::timeout_add_local` on the GTK main
//! thread, which is also the thread that created it.

use crate::ui::host::WizardHost;
use crate::ui::view::{Control, ControlKind, ControlRef, StepView};
use crate::ui::wizard::Wizard;
use adw::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

/// Application ID for the import wizard
const APP_ID: &str = "org.progressive.Import";

/// Pump interval of the UI loop
const PUMP_INTERVAL: Duration = Duration::from_millis(16);

/// Late-bound reference to the wizard a `GtkHost` belongs to
#[derive(Clone, Default)]
pub struct WizardSlot(Rc<RefCell<Option<Wizard>>>);

impl WizardSlot {
    pub fn fill(&self, wizard: Wizard) {
        *self.0.borrow_mut() = Some(wizard);
    }

    fn wizard(&self) -> Option<Wizard> {
        self.0.borrow().clone()
    }

    fn activate(&self, target: ControlRef) {
        if let Some(wizard) = self.wizard() {
            if let Some(step) = wizard.current_step() {
                step.activate(wizard.ui(), &target);
            }
        }
    }

    fn set_value(&self, id: &str, value: &str) {
        if let Some(wizard) = self.wizard() {
            if let Some(step) = wizard.current_step() {
                step.set_value(wizard.ui(), id, value);
            }
        }
    }
}

pub struct GtkHost {
    window: adw::ApplicationWindow,
    stack: gtk::Stack,
    strip: gtk::Box,
    titles: Vec<gtk::Label>,
    slot: WizardSlot,
}

impl GtkHost {
    pub fn new(window: &adw::ApplicationWindow) -> (Self, WizardSlot) {
        let strip = gtk::Box::builder()
            .orientation(gtk::Orientation::Horizontal)
            .spacing(18)
            .halign(gtk::Align::Center)
            .margin_top(12)
            .build();

        let stack = gtk::Stack::builder()
            .transition_type(gtk::StackTransitionType::SlideLeftRight)
            .vexpand(true)
            .build();

        let root = gtk::Box::builder()
            .orientation(gtk::Orientation::Vertical)
            .build();
        root.append(&adw::HeaderBar::new());
        root.append(&strip);
        root.append(&stack);
        window.set_content(Some(&root));

        let slot = WizardSlot::default();
        let host = Self {
            window: window.clone(),
            stack,
            strip,
            titles: Vec::new(),
            slot: slot.clone(),
        };

        (host, slot)
    }

    fn build_page(&self, view: &StepView) -> gtk::Box {
        let page = gtk::Box::builder()
            .orientation(gtk::Orientation::Vertical)
            .spacing(12)
            .margin_top(24)
            .margin_bottom(24)
            .margin_start(24)
            .margin_end(24)
            .build();

        if let Some(description) = view.description() {
            let label = gtk::Label::builder()
                .label(description)
                .wrap(true)
                .xalign(0.0)
                .build();
            label.add_css_class("title-4");
            page.append(&label);
        }

        for control in view.body() {
            let target = control.id.as_deref().map(ControlRef::from);
            let widget = self.build_control(control, target);
            widget.set_visible(control.visible);
            widget.set_sensitive(control.enabled);
            page.append(&widget);
        }

        let nav = gtk::Box::builder()
            .orientation(gtk::Orientation::Horizontal)
            .spacing(12)
            .halign(gtk::Align::End)
            .valign(gtk::Align::End)
            .vexpand(true)
            .build();
        for (index, control) in view.navigation().iter().enumerate() {
            let button = self.build_control(control, Some(ControlRef::Nav(index)));
            button.set_sensitive(control.enabled);
            nav.append(&button);
        }
        page.append(&nav);

        page
    }

    fn build_control(&self, control: &Control, target: Option<ControlRef>) -> gtk::Widget {
        let id = control.id.clone().unwrap_or_default();

        match control.kind {
            ControlKind::Button => {
                let button = gtk::Button::with_label(&control.label);
                if let Some(target) = target {
                    let slot = self.slot.clone();
                    button.connect_clicked(move |_| slot.activate(target.clone()));
                }
                button.upcast()
            }
            ControlKind::Label => gtk::Label::builder()
                .label(control.label.as_str())
                .wrap(true)
                .xalign(0.0)
                .build()
                .upcast(),
            ControlKind::Input => {
                let entry = gtk::Entry::builder()
                    .text(control.value.as_str())
                    .hexpand(true)
                    .build();
                let slot = self.slot.clone();
                entry.connect_changed(move |entry| slot.set_value(&id, entry.text().as_str()));
                labeled(&control.label, &entry)
            }
            ControlKind::Choice => {
                let options: Vec<&str> = control.options.iter().map(String::as_str).collect();
                let dropdown = gtk::DropDown::from_strings(&options);
                if let Some(pos) = control.options.iter().position(|o| *o == control.value) {
                    dropdown.set_selected(pos as u32);
                }
                let (slot, options) = (self.slot.clone(), control.options.clone());
                dropdown.connect_selected_notify(move |dropdown| {
                    if let Some(value) = options.get(dropdown.selected() as usize) {
                        slot.set_value(&id, value);
                    }
                });
                labeled(&control.label, &dropdown)
            }
            ControlKind::Indicator => gtk::Spinner::builder().spinning(true).build().upcast(),
            ControlKind::Table => {
                let grid = gtk::Grid::builder()
                    .column_spacing(12)
                    .row_spacing(4)
                    .build();
                for (row, cells) in control.rows.iter().enumerate() {
                    for (col, cell) in cells.iter().enumerate() {
                        let label = gtk::Label::builder().label(cell.as_str()).xalign(0.0).build();
                        grid.attach(&label, col as i32, row as i32, 1, 1);
                    }
                }
                gtk::ScrolledWindow::builder()
                    .child(&grid)
                    .min_content_height(160)
                    .vexpand(true)
                    .build()
                    .upcast()
            }
        }
    }

    fn show_page(&self, index: usize, id: &str, view: &StepView) {
        let page = self.build_page(view);
        if let Some(old) = self.stack.child_by_name(id) {
            self.stack.remove(&old);
        }
        self.stack.add_named(&page, Some(id));
        self.stack.set_visible_child_name(id);

        for (i, title) in self.titles.iter().enumerate() {
            if i == index {
                title.remove_css_class("dim-label");
                title.add_css_class("heading");
            } else {
                title.remove_css_class("heading");
                title.add_css_class("dim-label");
            }
        }
    }
}

fn labeled(text: &str, widget: &impl IsA<gtk::Widget>) -> gtk::Widget {
    let row = gtk::Box::builder()
        .orientation(gtk::Orientation::Horizontal)
        .spacing(12)
        .build();
    row.append(&gtk::Label::builder().label(text).width_chars(14).xalign(0.0).build());
    row.append(widget);
    row.upcast()
}

impl WizardHost for GtkHost {
    fn render_progress(&mut self, titles: &[String]) {
        for title in titles {
            let label = gtk::Label::new(Some(title.as_str()));
            label.add_css_class("dim-label");
            self.strip.append(&label);
            self.titles.push(label);
        }
    }

    fn attach(&mut self, _index: usize, id: &str, view: &StepView) {
        let page = self.build_page(view);
        self.stack.add_named(&page, Some(id));
    }

    fn mount(&mut self, index: usize, id: &str, view: &StepView) {
        self.show_page(index, id, view);
    }

    fn unmount(&mut self, _index: usize, id: &str) {
        tracing::debug!("Leaving page '{}'", id);
    }

    fn alert(&mut self, message: &str) {
        let dialog = adw::MessageDialog::new(Some(&self.window), None, Some(message));
        dialog.add_response("ok", "OK");
        dialog.present();
    }
}

/// Run the GTK application. `assemble` builds the wizard around the host;
/// it is set up and pumped here.
pub fn run<F>(title: &str, assemble: F) -> anyhow::Result<i32>
where
    F: Fn(GtkHost) -> anyhow::Result<Wizard> + 'static,
{
    if std::env::var("DISPLAY").is_err() && std::env::var("WAYLAND_DISPLAY").is_err() {
        anyhow::bail!("No display server detected (X11 or Wayland); run without --gui");
    }

    gtk::init().map_err(|e| anyhow::anyhow!("Failed to initialize GTK4: {}", e))?;
    adw::init().map_err(|e| anyhow::anyhow!("Failed to initialize Libadwaita: {}", e))?;

    let title = title.to_string();
    let app = adw::Application::builder().application_id(APP_ID).build();

    app.connect_activate(move |app| {
        let window = adw::ApplicationWindow::builder()
            .application(app)
            .title(title.as_str())
            .default_width(760)
            .default_height(560)
            .build();

        let (host, slot) = GtkHost::new(&window);
        let wizard = match assemble(host) {
            Ok(wizard) => wizard,
            Err(e) => {
                tracing::error!("Failed to build the wizard: {:#}", e);
                app.quit();
                return;
            }
        };

        slot.fill(wizard.clone());
        if let Err(e) = wizard.setup() {
            tracing::error!("Failed to set up the wizard: {}", e);
            app.quit();
            return;
        }

        glib::timeout_add_local(PUMP_INTERVAL, move || {
            wizard.ui().run_pending();
            wizard.sync();
            glib::ControlFlow::Continue
        });

        window.present();
    });

    // Our arguments are parsed by clap; keep GTK from reading them
    let exit_code = app.run_with_args::<&str>(&[]);
    Ok(exit_code.into())
}
