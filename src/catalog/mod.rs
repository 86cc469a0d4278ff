//! The recipe catalog: mutations that keep references consistent, plus
//! queries over the committed state.

pub mod integrity;
pub mod resolve;

pub use resolve::{AuthorView, IngredientView, RecipeView};

use chrono::Utc;
use uuid::Uuid;

use crate::config::Config;
use crate::error::CatalogResult;
use crate::models::{
    Author, AuthorPatch, Ingredient, IngredientPatch, NewAuthor, NewIngredient, NewRecipe, Recipe,
    RecipePatch,
};
use crate::store::{AnyBackend, Backend, Entity, Snapshot, Store, Tables, Violation};

const DEMO_AUTHOR: (&str, &str) = ("Demo Cook", "cook@example.com");
const DEMO_INGREDIENTS: [&str; 4] = ["Tomato", "Cheese", "Dough", "Pepperoni"];

pub struct Catalog<B = AnyBackend> {
    store: Store<B>,
}

impl Catalog<AnyBackend> {
    /// Opens the catalog on the backend selected by `config`.
    pub async fn open(config: &Config) -> CatalogResult<Self> {
        let backend = AnyBackend::from_config(config).await?;
        let store = Store::open(backend).await?;
        Ok(Self::new(store))
    }

    /// An empty catalog that lives only in memory.
    pub fn in_memory() -> Self {
        Self::new(Store::with_snapshot(
            AnyBackend::memory(),
            Snapshot::default(),
        ))
    }
}

impl<B: Backend> Catalog<B> {
    pub fn new(store: Store<B>) -> Self {
        Self { store }
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend().name()
    }

    // Mutations

    pub async fn add_author(&self, input: NewAuthor) -> CatalogResult<Author> {
        let author = self
            .store
            .transact(|draft| integrity::add_author(draft, input.clone()))
            .await?;
        tracing::info!(author_id = %author.id, email = %author.email, "Added author");
        Ok(author)
    }

    pub async fn update_author(&self, id: Uuid, patch: AuthorPatch) -> CatalogResult<Author> {
        let author = self
            .store
            .transact(|draft| integrity::update_author(draft, id, patch.clone()))
            .await?;
        tracing::info!(author_id = %id, "Updated author");
        Ok(author)
    }

    /// Deletes the author together with all of its recipes.
    pub async fn delete_author(&self, id: Uuid) -> CatalogResult<Author> {
        let author = self
            .store
            .transact(|draft| integrity::delete_author(draft, id))
            .await?;
        tracing::info!(
            author_id = %id,
            recipes = author.recipe_ids.len(),
            "Deleted author"
        );
        Ok(author)
    }

    pub async fn add_ingredient(&self, input: NewIngredient) -> CatalogResult<Ingredient> {
        let ingredient = self
            .store
            .transact(|draft| integrity::add_ingredient(draft, input.clone()))
            .await?;
        tracing::info!(ingredient_id = %ingredient.id, name = %ingredient.name, "Added ingredient");
        Ok(ingredient)
    }

    pub async fn update_ingredient(
        &self,
        id: Uuid,
        patch: IngredientPatch,
    ) -> CatalogResult<Ingredient> {
        let ingredient = self
            .store
            .transact(|draft| integrity::update_ingredient(draft, id, patch.clone()))
            .await?;
        tracing::info!(ingredient_id = %id, "Updated ingredient");
        Ok(ingredient)
    }

    pub async fn delete_ingredient(&self, id: Uuid) -> CatalogResult<Ingredient> {
        let ingredient = self
            .store
            .transact(|draft| integrity::delete_ingredient(draft, id))
            .await?;
        tracing::info!(ingredient_id = %id, "Deleted ingredient");
        Ok(ingredient)
    }

    pub async fn add_recipe(&self, input: NewRecipe) -> CatalogResult<Recipe> {
        let now = Utc::now();
        let recipe = self
            .store
            .transact(|draft| integrity::add_recipe(draft, input.clone(), now))
            .await?;
        tracing::info!(
            recipe_id = %recipe.id,
            author_id = %recipe.author_id,
            ingredients = recipe.ingredient_ids.len(),
            "Added recipe"
        );
        Ok(recipe)
    }

    pub async fn update_recipe(&self, id: Uuid, patch: RecipePatch) -> CatalogResult<Recipe> {
        let recipe = self
            .store
            .transact(|draft| integrity::update_recipe(draft, id, patch.clone()))
            .await?;
        tracing::info!(recipe_id = %id, "Updated recipe");
        Ok(recipe)
    }

    pub async fn delete_recipe(&self, id: Uuid) -> CatalogResult<Recipe> {
        let recipe = self
            .store
            .transact(|draft| integrity::delete_recipe(draft, id))
            .await?;
        tracing::info!(recipe_id = %id, "Deleted recipe");
        Ok(recipe)
    }

    // Queries

    pub async fn recipes(&self) -> Vec<Recipe> {
        let tables = self.store.read().await;
        let mut recipes: Vec<Recipe> = tables.all::<Recipe>().cloned().collect();
        resolve::sort_recipes(&mut recipes);
        recipes
    }

    pub async fn authors(&self) -> Vec<Author> {
        let tables = self.store.read().await;
        let mut authors: Vec<Author> = tables.all::<Author>().cloned().collect();
        resolve::sort_authors(&mut authors);
        authors
    }

    pub async fn ingredients(&self) -> Vec<Ingredient> {
        let tables = self.store.read().await;
        let mut ingredients: Vec<Ingredient> = tables.all::<Ingredient>().cloned().collect();
        resolve::sort_ingredients(&mut ingredients);
        ingredients
    }

    /// The author's recipes, in the order they were attached.
    pub async fn recipes_from_author(&self, author_id: Uuid) -> CatalogResult<Vec<Recipe>> {
        let tables = self.store.read().await;
        let recipes = resolve::recipes_by_author(&tables, author_id)?;
        Ok(recipes.into_iter().cloned().collect())
    }

    pub async fn recipes_with_ingredient(&self, ingredient_id: Uuid) -> CatalogResult<Vec<Recipe>> {
        let tables = self.store.read().await;
        let recipes = resolve::recipes_by_ingredient(&tables, ingredient_id)?;
        Ok(recipes.into_iter().cloned().collect())
    }

    /// The stored record itself, without resolving its references.
    pub async fn get<E: Entity>(&self, id: Uuid) -> Option<E> {
        self.store.read().await.get::<E>(id).cloned()
    }

    pub async fn recipe(&self, id: Uuid) -> CatalogResult<RecipeView> {
        let tables = self.store.read().await;
        let recipe = tables.require::<Recipe>(id)?;
        RecipeView::resolve(&tables, recipe)
    }

    pub async fn author(&self, id: Uuid) -> CatalogResult<AuthorView> {
        let tables = self.store.read().await;
        let author = tables.require::<Author>(id)?;
        AuthorView::resolve(&tables, author)
    }

    pub async fn ingredient(&self, id: Uuid) -> CatalogResult<IngredientView> {
        let tables = self.store.read().await;
        let ingredient = tables.require::<Ingredient>(id)?;
        IngredientView::resolve(&tables, ingredient)
    }

    pub async fn author_by_email(&self, email: &str) -> Option<Author> {
        let tables = self.store.read().await;
        let author = tables.all::<Author>().find(|a| a.has_email(email));
        author.cloned()
    }

    pub async fn ingredient_by_name(&self, name: &str) -> Option<Ingredient> {
        let tables = self.store.read().await;
        let ingredient = tables.all::<Ingredient>().find(|i| i.has_name(name));
        ingredient.cloned()
    }

    // Maintenance

    /// Invariant violations in the committed tables. Empty unless the
    /// underlying storage was edited by something other than this catalog.
    pub async fn integrity_report(&self) -> Vec<Violation> {
        self.store.read().await.integrity_violations()
    }

    /// A copy of the committed tables.
    pub async fn snapshot(&self) -> Tables {
        self.store.read().await.clone()
    }

    /// Adds a demo author and ingredients if the catalog is empty. Returns
    /// whether anything was added.
    pub async fn seed_defaults(&self) -> CatalogResult<bool> {
        let seeded = self
            .store
            .transact(|draft| {
                let empty = draft.iter::<Author>().next().is_none()
                    && draft.iter::<Ingredient>().next().is_none()
                    && draft.iter::<Recipe>().next().is_none();
                if !empty {
                    return Ok(false);
                }

                let (name, email) = DEMO_AUTHOR;
                integrity::add_author(
                    draft,
                    NewAuthor {
                        name: name.to_string(),
                        email: email.to_string(),
                    },
                )?;
                for name in DEMO_INGREDIENTS {
                    integrity::add_ingredient(
                        draft,
                        NewIngredient {
                            name: name.to_string(),
                        },
                    )?;
                }
                Ok(true)
            })
            .await?;

        if seeded {
            tracing::info!(
                ingredients = DEMO_INGREDIENTS.len(),
                "Seeded empty catalog with demo records"
            );
        }
        Ok(seeded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CatalogError, StorageError};
    use crate::store::{ChangeSet, Collection, MemoryBackend};
    use std::sync::Arc;
    use std::time::Duration;

    /// Persists immediately, then keeps the caller waiting.
    struct SlowCommit {
        inner: MemoryBackend,
        delay: Duration,
    }

    impl Backend for SlowCommit {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn load(&self) -> Result<Snapshot, StorageError> {
            self.inner.load().await
        }

        async fn revision(&self) -> Result<u64, StorageError> {
            self.inner.revision().await
        }

        async fn commit(&self, changes: &ChangeSet, base: u64) -> Result<u64, StorageError> {
            let revision = self.inner.commit(changes, base).await?;
            tokio::time::sleep(self.delay).await;
            Ok(revision)
        }
    }

    async fn author(catalog: &Catalog, name: &str, email: &str) -> Author {
        catalog
            .add_author(NewAuthor {
                name: name.to_string(),
                email: email.to_string(),
            })
            .await
            .unwrap()
    }

    async fn ingredient(catalog: &Catalog, name: &str) -> Ingredient {
        catalog
            .add_ingredient(NewIngredient {
                name: name.to_string(),
            })
            .await
            .unwrap()
    }

    fn recipe_input(title: &str, author_id: Uuid, ingredient_ids: Vec<Uuid>) -> NewRecipe {
        NewRecipe {
            title: title.to_string(),
            description: "desc".to_string(),
            author_id,
            ingredient_ids,
        }
    }

    #[tokio::test]
    async fn test_pizza_scenario() {
        let catalog = Catalog::in_memory();
        let a = author(&catalog, "A", "a@x.com").await;
        let tomato = ingredient(&catalog, "Tomato").await;
        let cheese = ingredient(&catalog, "Cheese").await;

        let pizza = catalog
            .add_recipe(recipe_input("Pizza", a.id, vec![tomato.id, cheese.id]))
            .await
            .unwrap();
        assert_eq!(pizza.ingredient_ids, vec![tomato.id, cheese.id]);

        let with_tomato = catalog.recipes_with_ingredient(tomato.id).await.unwrap();
        assert_eq!(with_tomato, vec![pizza.clone()]);

        catalog.delete_ingredient(tomato.id).await.unwrap();
        let view = catalog.recipe(pizza.id).await.unwrap();
        assert_eq!(view.recipe.ingredient_ids, vec![cheese.id]);
        assert!(catalog.integrity_report().await.is_empty());

        catalog.delete_author(a.id).await.unwrap();
        assert!(catalog.recipes().await.is_empty());
        assert!(catalog.integrity_report().await.is_empty());
    }

    #[tokio::test]
    async fn test_recipes_from_author_round_trip() {
        let catalog = Catalog::in_memory();
        let a = author(&catalog, "A", "a@x.com").await;
        let recipe = catalog
            .add_recipe(recipe_input("Soup", a.id, vec![]))
            .await
            .unwrap();

        let recipes = catalog.recipes_from_author(a.id).await.unwrap();
        assert_eq!(recipes.iter().filter(|r| r.id == recipe.id).count(), 1);
    }

    #[tokio::test]
    async fn test_delete_recipe_twice() {
        let catalog = Catalog::in_memory();
        let a = author(&catalog, "A", "a@x.com").await;
        let recipe = catalog
            .add_recipe(recipe_input("Soup", a.id, vec![]))
            .await
            .unwrap();

        assert!(catalog.delete_recipe(recipe.id).await.is_ok());
        let err = catalog.delete_recipe(recipe.id).await.unwrap_err();
        assert!(matches!(
            err,
            CatalogError::NotFound {
                collection: Collection::Recipes,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_duplicate_email_creates_nothing() {
        let catalog = Catalog::in_memory();
        author(&catalog, "A", "a@x.com").await;

        let err = catalog
            .add_author(NewAuthor {
                name: "B".to_string(),
                email: "a@x.com".to_string(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, CatalogError::AlreadyExists { .. }));
        assert_eq!(catalog.authors().await.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_mutation_leaves_snapshot_unchanged() {
        let catalog = Catalog::in_memory();
        let a = author(&catalog, "A", "a@x.com").await;
        let tomato = ingredient(&catalog, "Tomato").await;
        let before = catalog.snapshot().await;

        let err = catalog
            .add_recipe(recipe_input("Pizza", a.id, vec![tomato.id, Uuid::new_v4()]))
            .await
            .unwrap_err();

        assert!(matches!(err, CatalogError::NotFound { .. }));
        assert_eq!(catalog.snapshot().await, before);
    }

    #[tokio::test]
    async fn test_lookups_by_key() {
        let catalog = Catalog::in_memory();
        let a = author(&catalog, "A", "a@x.com").await;
        let tomato = ingredient(&catalog, "Tomato").await;

        assert_eq!(catalog.author_by_email("A@X.COM").await, Some(a));
        assert_eq!(catalog.ingredient_by_name(" tomato").await, Some(tomato));
        assert!(catalog.author_by_email("nobody@x.com").await.is_none());
    }

    #[tokio::test]
    async fn test_list_ordering() {
        let catalog = Catalog::in_memory();
        author(&catalog, "zed", "z@x.com").await;
        author(&catalog, "Amy", "amy@x.com").await;

        let names: Vec<String> = catalog.authors().await.into_iter().map(|a| a.name).collect();
        assert_eq!(names, vec!["Amy", "zed"]);
    }

    #[tokio::test]
    async fn test_seed_defaults_only_when_empty() {
        let catalog = Catalog::in_memory();
        assert!(catalog.seed_defaults().await.unwrap());
        assert_eq!(catalog.authors().await.len(), 1);
        assert_eq!(catalog.ingredients().await.len(), DEMO_INGREDIENTS.len());

        assert!(!catalog.seed_defaults().await.unwrap());
        assert_eq!(catalog.authors().await.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_add_recipe_keeps_invariants() {
        let catalog = Arc::new(Catalog::in_memory());
        let a = author(&catalog, "A", "a@x.com").await;
        let tomato = ingredient(&catalog, "Tomato").await;

        let mut handles = Vec::new();
        for i in 0..20 {
            let catalog = Arc::clone(&catalog);
            let input = recipe_input(&format!("Recipe {}", i), a.id, vec![tomato.id]);
            handles.push(tokio::spawn(async move {
                catalog.add_recipe(input).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(catalog.recipes().await.len(), 20);
        assert_eq!(catalog.recipes_from_author(a.id).await.unwrap().len(), 20);
        assert_eq!(
            catalog.recipes_with_ingredient(tomato.id).await.unwrap().len(),
            20
        );
        assert!(catalog.integrity_report().await.is_empty());
    }

    #[tokio::test]
    async fn test_abandoned_mutation_still_becomes_visible() {
        let store = Store::open(SlowCommit {
            inner: MemoryBackend::new(),
            delay: Duration::from_millis(200),
        })
        .await
        .unwrap();
        let catalog = Catalog::new(store);

        let timed_out = tokio::time::timeout(
            Duration::from_millis(20),
            catalog.add_author(NewAuthor {
                name: "A".to_string(),
                email: "a@x.com".to_string(),
            }),
        )
        .await
        .is_err();
        assert!(timed_out);

        let authors = catalog.authors().await;
        assert_eq!(authors.len(), 1);
        assert_eq!(authors[0].email, "a@x.com");

        // The next mutation drafts against the persisted author.
        let err = catalog
            .add_author(NewAuthor {
                name: "Again".to_string(),
                email: "a@x.com".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn test_get_returns_stored_record() {
        let catalog = Catalog::in_memory();
        let a = author(&catalog, "A", "a@x.com").await;

        assert_eq!(catalog.get::<Author>(a.id).await, Some(a));
        assert!(catalog.get::<Recipe>(Uuid::new_v4()).await.is_none());
    }
}
