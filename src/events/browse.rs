use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::axtree::AxTreeFlattener;

/// Which browsing action produced the page state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrowseTrigger {
    /// Plain URL visit; the page content is shown as text.
    Browse,
    /// Element-level interaction; the accessibility tree is shown.
    BrowseInteractive,
}

/// Page state after a browsing action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserOutputObservation {
    pub url: String,
    pub trigger_by_action: BrowseTrigger,
    /// Page text, used for plain URL visits.
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub screenshot: String,
    /// Screenshot annotated with element marks, as a data URL.
    #[serde(default)]
    pub set_of_marks: String,
    #[serde(default)]
    pub error: bool,
    #[serde(default)]
    pub open_pages_urls: Vec<String>,
    #[serde(default)]
    pub axtree_object: Value,
    #[serde(default)]
    pub extra_element_properties: Value,
    #[serde(default)]
    pub last_browser_action: String,
    #[serde(default)]
    pub last_browser_action_error: String,
    #[serde(default)]
    pub focused_element_bid: String,
    #[serde(default)]
    pub filter_visible_only: bool,
}

const AXTREE_NOTE: &str = "Note: [bid] is the unique alpha-numeric identifier at the beginning of lines for each element in the AXTree. Always use bid to refer to elements in your actions.\n";

impl BrowserOutputObservation {
    /// The text the agent sees for this page. Accessibility-tree failures
    /// are reported inline instead of failing the whole render.
    pub fn agent_text(&self, flattener: &dyn AxTreeFlattener) -> String {
        match self.trigger_by_action {
            BrowseTrigger::BrowseInteractive => self.interactive_text(flattener),
            BrowseTrigger::Browse => self.page_text(),
        }
    }

    fn interactive_text(&self, flattener: &dyn AxTreeFlattener) -> String {
        let mut text = format!(
            "[Current URL: {}]\n[Focused element bid: {}]\n\n",
            self.url, self.focused_element_bid
        );
        if self.error {
            text.push_str(&error_banner(
                "The following error occurred when executing the last action:",
                &self.last_browser_action_error,
            ));
        } else {
            text.push_str("[Action executed successfully.]\n");
        }

        match flattener.flatten(
            &self.axtree_object,
            &self.extra_element_properties,
            self.filter_visible_only,
        ) {
            Ok(tree) => {
                if self.filter_visible_only {
                    text.push_str("Accessibility tree of the VISIBLE portion of the webpage (accessibility tree of complete webpage is too large and you may need to scroll to view remaining portion of the webpage):\n");
                } else {
                    text.push_str("Accessibility tree of the COMPLETE webpage:\n");
                }
                text.push_str(AXTREE_NOTE);
                text.push_str("============== BEGIN accessibility tree ==============\n");
                text.push_str(&tree);
                text.push_str("\n============== END accessibility tree ==============\n");
            }
            Err(e) => {
                warn!(url = %self.url, error = %e, "failed to flatten accessibility tree");
                text.push_str(&format!(
                    "\n[Error encountered when processing the accessibility tree: {e}]\n"
                ));
            }
        }
        text
    }

    fn page_text(&self) -> String {
        let mut text = format!("[Current URL: {}]\n", self.url);
        if self.error {
            text.push_str(&error_banner(
                "The following error occurred when trying to visit the URL:",
                &self.last_browser_action_error,
            ));
        }
        text.push_str("============== BEGIN webpage content ==============\n");
        text.push_str(&self.content);
        text.push_str("\n============== END webpage content ==============\n");
        text
    }
}

fn error_banner(headline: &str, detail: &str) -> String {
    format!(
        "================ BEGIN error message ===============\n{headline}\n{detail}\n================ END error message ===============\n"
    )
}
