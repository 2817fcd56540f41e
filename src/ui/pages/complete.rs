//! Complete Page - Summary of the last import

use crate::i18n::Catalog;
use crate::ui::step::{Step, StepBase, StepHandle};
use crate::ui::view::Control;

const SUMMARY_LABEL: &str = "summary";

pub struct CompletePage {
    base: StepBase,
}

impl CompletePage {
    pub fn new(strings: Catalog) -> StepHandle {
        let mut base = StepBase::new(strings);
        base.view_mut().push(Control::label(SUMMARY_LABEL, ""));

        StepHandle::from_step(Self { base })
    }

    fn summary_text(&self) -> String {
        let last = self
            .base
            .context()
            .and_then(|context| context.with(|ctx| ctx.import.last_import.clone()));

        let text = match last {
            Some(summary) => self.base.strings().format(
                "summary",
                &[
                    ("records", summary.records.to_string()),
                    ("source", summary.source.display().to_string()),
                    ("output", summary.output.display().to_string()),
                ],
            ),
            None => self.base.get_string("nothing_imported"),
        };

        text.unwrap_or_else(|e| {
            tracing::error!("{}", e);
            String::new()
        })
    }
}

impl Step for CompletePage {
    fn base(&self) -> &StepBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut StepBase {
        &mut self.base
    }

    fn on_load(&mut self) -> anyhow::Result<()> {
        // Both texts must exist before the page can ever be shown
        self.base.get_string("summary")?;
        self.base.get_string("nothing_imported")?;
        Ok(())
    }

    fn on_shown(&mut self) {
        let text = self.summary_text();
        self.base.view_mut().set_label(SUMMARY_LABEL, text);
    }
}
