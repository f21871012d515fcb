//! Spawn-collaborator seam.
//!
//! Only the coordinator invokes the spawner: once when seeding the session
//! and once per correct placement, to produce the replacement object's
//! category. Object ids are assigned by the Node, not the spawner.

/// Chooses the category for the next shared object.
pub trait Spawner {
    fn next_category(&mut self) -> String;
}

/// Default spawner: a uniformly random pick from a fixed category list.
pub struct RandomSpawner {
    categories: Vec<String>,
}

impl RandomSpawner {
    pub fn new(categories: Vec<String>) -> Self {
        Self { categories }
    }
}

impl Default for RandomSpawner {
    fn default() -> Self {
        Self::new(
            ["Sales", "Marketing", "HR", "Finance"]
                .into_iter()
                .map(String::from)
                .collect(),
        )
    }
}

impl Spawner for RandomSpawner {
    fn next_category(&mut self) -> String {
        let index = fastrand::usize(..self.categories.len());
        self.categories[index].clone()
    }
}
