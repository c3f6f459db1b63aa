/// A key-value pair stored in a tree node.
pub struct Entry<T, U> {
    pub key: T,
    pub value: U,
}
