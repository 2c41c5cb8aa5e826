use std::collections::HashMap;

/// Maps categorical tag strings to dense ids for the mining library and
/// back again for reporting.
pub struct Itemizer {
    item_ids: HashMap<String, usize>,
    item_names: Vec<String>,
}

impl Itemizer {
    pub fn new() -> Itemizer {
        Itemizer {
            item_ids: HashMap::new(),
            item_names: Vec::new(),
        }
    }

    pub fn id_of(&mut self, tag: &str) -> usize {
        if let Some(&id) = self.item_ids.get(tag) {
            return id;
        }
        let id = self.item_names.len();
        self.item_ids.insert(tag.to_owned(), id);
        self.item_names.push(tag.to_owned());
        id
    }

    pub fn str_of(&self, id: usize) -> &str {
        &self.item_names[id]
    }

    pub fn to_id_vec(&mut self, tags: &[String]) -> Vec<usize> {
        tags.iter().map(|tag| self.id_of(tag)).collect()
    }
}
