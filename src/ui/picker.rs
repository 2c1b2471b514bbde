/// Selection list shown over the transcript, used for choosing a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickerState {
    pub title: String,
    pub items: Vec<String>,
    pub selected: usize,
}

impl PickerState {
    pub fn new<T: Into<String>>(title: T, items: Vec<String>, selected: usize) -> Self {
        let selected = selected.min(items.len().saturating_sub(1));
        Self {
            title: title.into(),
            items,
            selected,
        }
    }

    /// Picker over `models` with `current` preselected when present.
    pub fn for_models(models: &[String], current: &str) -> Self {
        let selected = models
            .iter()
            .position(|model| model == current)
            .unwrap_or(0);
        Self::new("Select a model", models.to_vec(), selected)
    }

    pub fn selected_item(&self) -> Option<&str> {
        self.items.get(self.selected).map(String::as_str)
    }

    pub fn move_up(&mut self) {
        if !self.items.is_empty() {
            if self.selected == 0 {
                self.selected = self.items.len() - 1;
            } else {
                self.selected -= 1;
            }
        }
    }

    pub fn move_down(&mut self) {
        if !self.items.is_empty() {
            self.selected = (self.selected + 1) % self.items.len();
        }
    }

    pub fn move_to_start(&mut self) {
        self.selected = 0;
    }

    pub fn move_to_end(&mut self) {
        self.selected = self.items.len().saturating_sub(1);
    }
}
