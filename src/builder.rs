use crate::pipeline::Pipeline;

/// Accumulates pushed elements and turns them into a pipeline.
///
/// The pipeline yields exactly the accumulated elements in push order and is
/// replayable.
#[derive(Debug, Clone)]
pub struct StreamBuilder<T> {
    items: Vec<T>,
}

impl<T> Default for StreamBuilder<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T> StreamBuilder<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, item: T) -> Self {
        self.items.push(item);
        self
    }

    pub fn accept(&mut self, item: T) {
        self.items.push(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> StreamBuilder<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn build(self) -> Pipeline<T> {
        Pipeline::of(self.items)
    }
}
