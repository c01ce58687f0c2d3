// Shared fixtures for the integration suites: a small three-level class
// family whose constructors mark which hierarchy levels ran, plus a
// payload-less class for tests that only need instances to exist.

#![allow(dead_code)]

use objkit::runtime::{
    ClassDescriptor, ClassRegistry, DescriptorBuilder, ObjectPtr, instance_size_for,
};
use objkit::Result;

/// Payload shared by the Stage family; each level's constructor sets its
/// own bit so tests can assert exactly which levels ran, in the instance
/// itself, without global state.
#[repr(C)]
pub struct Marks {
    pub constructed: u32,
}

pub const STAGE_BIT: u32 = 0b001;
pub const PIPE_BIT: u32 = 0b010;
pub const SINK_BIT: u32 = 0b100;

fn mark(obj: ObjectPtr, bit: u32) -> Result<()> {
    // SAFETY: only Stage-family constructors call this, and every class in
    // the family carries a Marks payload
    unsafe { obj.state_mut::<Marks>().constructed |= bit };
    Ok(())
}

fn stage_construct(obj: ObjectPtr) -> Result<()> {
    mark(obj, STAGE_BIT)
}

fn pipe_construct(obj: ObjectPtr) -> Result<()> {
    mark(obj, PIPE_BIT)
}

fn sink_construct(obj: ObjectPtr) -> Result<()> {
    mark(obj, SINK_BIT)
}

pub static STAGE: ClassDescriptor =
    DescriptorBuilder::new("Stage", instance_size_for::<Marks>())
        .construct(stage_construct)
        .build();

pub static PIPE: ClassDescriptor =
    DescriptorBuilder::new("Stage:Pipe", instance_size_for::<Marks>())
        .construct(pipe_construct)
        .build();

pub static SINK: ClassDescriptor =
    DescriptorBuilder::new("Stage:Pipe:Sink", instance_size_for::<Marks>())
        .construct(sink_construct)
        .build();

pub static BLANK: ClassDescriptor =
    DescriptorBuilder::new("Blank", instance_size_for::<()>()).build();

/// Registry preloaded with the Stage family and Blank.
pub fn fixture_registry() -> ClassRegistry {
    let mut registry = ClassRegistry::new();
    for cls in [&STAGE, &PIPE, &SINK, &BLANK] {
        registry.register(cls).expect("fixture registration failed");
    }
    registry
}

/// Which construction bits are set on a Stage-family instance.
pub fn construction_marks(obj: ObjectPtr) -> u32 {
    // SAFETY: callers only pass Stage-family instances
    unsafe { obj.state::<Marks>().constructed }
}
