pub(crate) mod path2d;
pub(crate) mod registry;
