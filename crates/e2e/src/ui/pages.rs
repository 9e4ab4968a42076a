//! Dashboard page objects

use playtype_common::HarnessResult;

use super::browser::{BrowserSession, PageOutput};
use super::page::PageActions;

const QUEST_NAME_INPUT: &str = r#"input[name="questName"]"#;
const QUEST_DESCRIPTION_INPUT: &str = r#"textarea[name="questDescription"]"#;
const SUBMIT_BUTTON: &str = r#"button[type="submit"]"#;

/// Output key holding the create confirmation text
pub const SUCCESS_MESSAGE_KEY: &str = "success_message";
/// Output key holding the update confirmation text
pub const UPDATE_MESSAGE_KEY: &str = "update_message";

/// Quest creation form
pub struct CreateQuestPage<'p> {
    actions: &'p mut PageActions,
}

impl<'p> CreateQuestPage<'p> {
    pub fn new(actions: &'p mut PageActions) -> Self {
        Self { actions }
    }

    pub fn actions(&mut self) -> &mut PageActions {
        &mut *self.actions
    }

    pub fn click_create_button(&mut self) -> &mut Self {
        self.actions.click(".fa.fa-plus");
        self
    }

    pub fn fill_quest_form(&mut self, name: &str, description: &str) -> &mut Self {
        self.actions
            .fill(QUEST_NAME_INPUT, name)
            .fill(QUEST_DESCRIPTION_INPUT, description);
        self
    }

    pub fn submit_quest(&mut self) -> &mut Self {
        self.actions.click(SUBMIT_BUTTON);
        self
    }

    /// Read `.success-message` into [`SUCCESS_MESSAGE_KEY`]
    pub fn read_success_message(&mut self) -> &mut Self {
        self.actions
            .wait_for_visible(".success-message")
            .read_text(".success-message", SUCCESS_MESSAGE_KEY);
        self
    }
}

/// Quest edit form
pub struct UpdateQuestPage<'p> {
    actions: &'p mut PageActions,
}

impl<'p> UpdateQuestPage<'p> {
    pub fn new(actions: &'p mut PageActions) -> Self {
        Self { actions }
    }

    pub fn actions(&mut self) -> &mut PageActions {
        &mut *self.actions
    }

    pub fn update_quest_name(&mut self, name: &str) -> &mut Self {
        self.actions.fill(QUEST_NAME_INPUT, name);
        self
    }

    pub fn update_quest_description(&mut self, description: &str) -> &mut Self {
        self.actions.fill(QUEST_DESCRIPTION_INPUT, description);
        self
    }

    pub fn save_changes(&mut self) -> &mut Self {
        self.actions.click(SUBMIT_BUTTON);
        self
    }

    /// Read `.update-message` into [`UPDATE_MESSAGE_KEY`]
    pub fn read_update_message(&mut self) -> &mut Self {
        self.actions
            .wait_for_visible(".update-message")
            .read_text(".update-message", UPDATE_MESSAGE_KEY);
        self
    }
}

/// Hands out page objects over one shared action recording
#[derive(Debug, Default)]
pub struct PageManager {
    actions: PageActions,
}

impl PageManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_quest_page(&mut self) -> CreateQuestPage<'_> {
        CreateQuestPage::new(&mut self.actions)
    }

    pub fn update_quest_page(&mut self) -> UpdateQuestPage<'_> {
        UpdateQuestPage::new(&mut self.actions)
    }

    pub fn actions(&mut self) -> &mut PageActions {
        &mut self.actions
    }

    /// Run everything recorded through any page
    pub async fn run(&mut self, session: &BrowserSession) -> HarnessResult<PageOutput> {
        self.actions.run(session).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::spec::UiStep;

    #[test]
    fn test_pages_share_one_recording() {
        let mut manager = PageManager::new();
        manager
            .create_quest_page()
            .click_create_button()
            .fill_quest_form("Test Quest", "A quest for testing.")
            .submit_quest()
            .read_success_message();
        manager
            .update_quest_page()
            .update_quest_name("Renamed")
            .save_changes();

        let steps = manager.actions().steps();
        assert_eq!(steps.len(), 8);
        assert_eq!(
            steps[0],
            UiStep::Click {
                selector: ".fa.fa-plus".to_string(),
                timeout_ms: None
            }
        );
        assert_eq!(
            steps[5],
            UiStep::ReadText {
                selector: ".success-message".to_string(),
                key: SUCCESS_MESSAGE_KEY.to_string()
            }
        );
        assert_eq!(
            steps[6],
            UiStep::Fill {
                selector: QUEST_NAME_INPUT.to_string(),
                value: "Renamed".to_string()
            }
        );
    }
}
