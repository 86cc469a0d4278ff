//! Referential-integrity checks over committed tables.

use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

use super::{Collection, Entity, Tables};
use crate::models::{Author, Ingredient, Recipe, RecipeRefs};

/// A broken cross-reference or uniqueness constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// A recipe names an author that does not exist.
    MissingAuthor { recipe: Uuid, author: Uuid },
    /// A recipe names an ingredient that does not exist.
    MissingIngredient { recipe: Uuid, ingredient: Uuid },
    /// A recipe lists the same ingredient twice.
    DuplicateIngredient { recipe: Uuid, ingredient: Uuid },
    /// The owner's back-reference list does not contain the recipe.
    MissingBackReference {
        collection: Collection,
        owner: Uuid,
        recipe: Uuid,
    },
    /// The owner's back-reference list contains the recipe more than once.
    DuplicateBackReference {
        collection: Collection,
        owner: Uuid,
        recipe: Uuid,
    },
    /// The owner lists a recipe that is gone or does not point back.
    DanglingBackReference {
        collection: Collection,
        owner: Uuid,
        recipe: Uuid,
    },
    /// Two records share a value that must be unique.
    DuplicateKey {
        collection: Collection,
        field: &'static str,
        value: String,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::MissingAuthor { recipe, author } => {
                write!(f, "recipe {} references missing author {}", recipe, author)
            }
            Violation::MissingIngredient { recipe, ingredient } => write!(
                f,
                "recipe {} references missing ingredient {}",
                recipe, ingredient
            ),
            Violation::DuplicateIngredient { recipe, ingredient } => write!(
                f,
                "recipe {} lists ingredient {} more than once",
                recipe, ingredient
            ),
            Violation::MissingBackReference {
                collection,
                owner,
                recipe,
            } => write!(
                f,
                "{} {} does not list recipe {}",
                collection, owner, recipe
            ),
            Violation::DuplicateBackReference {
                collection,
                owner,
                recipe,
            } => write!(
                f,
                "{} {} lists recipe {} more than once",
                collection, owner, recipe
            ),
            Violation::DanglingBackReference {
                collection,
                owner,
                recipe,
            } => write!(
                f,
                "{} {} lists recipe {} which does not reference it",
                collection, owner, recipe
            ),
            Violation::DuplicateKey {
                collection,
                field,
                value,
            } => write!(f, "{} {} '{}' is not unique", collection, field, value),
        }
    }
}

impl Tables {
    /// Returns every invariant violation; empty for a consistent catalog.
    pub fn integrity_violations(&self) -> Vec<Violation> {
        let mut violations = Vec::new();

        for recipe in self.recipes.values() {
            check_recipe(self, recipe, &mut violations);
        }

        for author in self.authors.values() {
            check_back_references(self, Collection::Authors, author, &mut violations, |r| {
                r.author_id == author.id
            });
        }
        for ingredient in self.ingredients.values() {
            check_back_references(
                self,
                Collection::Ingredients,
                ingredient,
                &mut violations,
                |r| r.ingredient_ids.contains(&ingredient.id),
            );
        }

        check_unique(
            Collection::Authors,
            "email",
            self.authors.values().map(|a: &Author| a.email.as_str()),
            &mut violations,
        );
        check_unique(
            Collection::Ingredients,
            "name",
            self.ingredients.values().map(|i: &Ingredient| i.name.as_str()),
            &mut violations,
        );

        violations
    }
}

fn check_recipe(tables: &Tables, recipe: &Recipe, violations: &mut Vec<Violation>) {
    match tables.authors.get(&recipe.author_id) {
        Some(author) => {
            check_listed(Collection::Authors, author, recipe.id, violations);
        }
        None => violations.push(Violation::MissingAuthor {
            recipe: recipe.id,
            author: recipe.author_id,
        }),
    }

    let mut seen = Vec::with_capacity(recipe.ingredient_ids.len());
    for &ingredient_id in &recipe.ingredient_ids {
        if seen.contains(&ingredient_id) {
            violations.push(Violation::DuplicateIngredient {
                recipe: recipe.id,
                ingredient: ingredient_id,
            });
            continue;
        }
        seen.push(ingredient_id);

        match tables.ingredients.get(&ingredient_id) {
            Some(ingredient) => {
                check_listed(Collection::Ingredients, ingredient, recipe.id, violations);
            }
            None => violations.push(Violation::MissingIngredient {
                recipe: recipe.id,
                ingredient: ingredient_id,
            }),
        }
    }
}

/// The recipe must appear exactly once in the owner's list.
fn check_listed<O: RecipeRefs + Entity>(
    collection: Collection,
    owner: &O,
    recipe: Uuid,
    violations: &mut Vec<Violation>,
) {
    let occurrences = owner.recipe_ids().iter().filter(|id| **id == recipe).count();
    let owner = owner.id();
    match occurrences {
        0 => violations.push(Violation::MissingBackReference {
            collection,
            owner,
            recipe,
        }),
        1 => {}
        _ => violations.push(Violation::DuplicateBackReference {
            collection,
            owner,
            recipe,
        }),
    }
}

fn check_back_references<O: RecipeRefs + Entity>(
    tables: &Tables,
    collection: Collection,
    owner: &O,
    violations: &mut Vec<Violation>,
    points_back: impl Fn(&Recipe) -> bool,
) {
    for &recipe_id in owner.recipe_ids() {
        let consistent = tables
            .recipes
            .get(&recipe_id)
            .map_or(false, |recipe| points_back(recipe));
        if !consistent {
            violations.push(Violation::DanglingBackReference {
                collection,
                owner: owner.id(),
                recipe: recipe_id,
            });
        }
    }
}

fn check_unique<'a>(
    collection: Collection,
    field: &'static str,
    values: impl Iterator<Item = &'a str>,
    violations: &mut Vec<Violation>,
) {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for value in values {
        *counts.entry(value.trim().to_lowercase()).or_default() += 1;
    }
    for (value, count) in counts {
        if count > 1 {
            violations.push(Violation::DuplicateKey {
                collection,
                field,
                value,
            });
        }
    }
}
