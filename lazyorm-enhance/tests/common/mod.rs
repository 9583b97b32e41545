#![allow(dead_code)]

use lazyorm_enhance::{ClassDescriptor, MAPPED_SUPERCLASS, class_file_path};
use lazyorm_model::AttributeMetadata;
use std::fs;
use std::path::{Path, PathBuf};

/// `org.foo.Person`: an entity with one lazy attribute and two associations.
pub fn person() -> ClassDescriptor {
    ClassDescriptor::entity("org.foo.Person", "id")
        .with_attribute(AttributeMetadata::basic("name"))
        .with_attribute(AttributeMetadata::lazy("bio"))
        .with_attribute(AttributeMetadata::to_one("employer"))
        .with_attribute(AttributeMetadata::to_many("friends"))
        .with_attribute(AttributeMetadata::embedded("address"))
        .with_attribute(AttributeMetadata::transient("visits"))
}

pub fn address() -> ClassDescriptor {
    ClassDescriptor::embeddable("org.foo.Address")
        .with_attribute(AttributeMetadata::basic("city"))
        .with_attribute(AttributeMetadata::basic("street"))
}

pub fn base_entity() -> ClassDescriptor {
    ClassDescriptor::new("org.foo.BaseEntity")
        .annotated(MAPPED_SUPERCLASS)
        .with_attribute(AttributeMetadata::lazy("audit"))
}

/// Writes a descriptor as the class file for its name below `root`.
pub fn write_class(root: &Path, descriptor: &ClassDescriptor) -> PathBuf {
    write_raw(root, &descriptor.name, &descriptor.to_bytes().unwrap())
}

pub fn write_raw(root: &Path, class_name: &str, bytes: &[u8]) -> PathBuf {
    let path = root.join(class_file_path(class_name));
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, bytes).unwrap();
    path
}

pub fn read_class(path: &Path) -> ClassDescriptor {
    serde_json::from_slice(&fs::read(path).unwrap()).unwrap()
}
