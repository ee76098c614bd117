// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Domain fixtures shared by the merge tests.

use crate::stamped::Stamped;
use std::fmt::{self, Display};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Person {
    pub name: String,
    pub age: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Animal {
    pub name: String,
    pub legs: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Plant {
    pub name: String,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum TestData {
    Person(Person),
    Animal(Animal),
    Plant(Plant),
}

impl TestData {
    /// The numeric attribute of the fixture (age, legs or height).
    ///
    /// Handy as a merge key when a test wants ordering by content.
    #[must_use]
    pub const fn measure(&self) -> u64 {
        match self {
            Self::Person(p) => p.age as u64,
            Self::Animal(a) => a.legs as u64,
            Self::Plant(p) => p.height as u64,
        }
    }

    /// Stamp this fixture with an explicit merge key.
    #[must_use]
    pub const fn at(self, key: u64) -> Stamped<Self> {
        Stamped::new(key, self)
    }
}

pub fn person(name: &str, age: u32) -> TestData {
    TestData::Person(Person {
        name: name.to_string(),
        age,
    })
}

pub fn animal(name: &str, legs: u32) -> TestData {
    TestData::Animal(Animal {
        name: name.to_string(),
        legs,
    })
}

pub fn plant(name: &str, height: u32) -> TestData {
    TestData::Plant(Plant {
        name: name.to_string(),
        height,
    })
}

pub fn person_alice() -> TestData {
    person("Alice", 25)
}

pub fn person_bob() -> TestData {
    person("Bob", 30)
}

pub fn person_charlie() -> TestData {
    person("Charlie", 35)
}

pub fn person_diane() -> TestData {
    person("Diane", 40)
}

pub fn animal_bird() -> TestData {
    animal("Bird", 2)
}

pub fn animal_dog() -> TestData {
    animal("Dog", 4)
}

pub fn animal_spider() -> TestData {
    animal("Spider", 8)
}

pub fn plant_rose() -> TestData {
    plant("Rose", 15)
}

pub fn plant_fern() -> TestData {
    plant("Fern", 150)
}

pub fn plant_sunflower() -> TestData {
    plant("Sunflower", 180)
}

impl Display for TestData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Person(p) => write!(f, "Person[name={}, age={}]", p.name, p.age),
            Self::Animal(a) => write!(f, "Animal[name={}, legs={}]", a.name, a.legs),
            Self::Plant(p) => write!(f, "Plant[name={}, height={}]", p.name, p.height),
        }
    }
}
