//! Welcome Page - Explains the import and starts the wizard

use crate::i18n::Catalog;
use crate::ui::step::{Step, StepBase, StepHandle};

pub struct WelcomePage {
    base: StepBase,
}

impl WelcomePage {
    pub fn new(strings: Catalog) -> StepHandle {
        StepHandle::from_step(Self {
            base: StepBase::new(strings),
        })
    }
}

impl Step for WelcomePage {
    fn base(&self) -> &StepBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut StepBase {
        &mut self.base
    }
}
