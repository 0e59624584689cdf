pub mod books;

use bookshelf_kernel::ModuleRegistry;

use books::repository::BookRepositoryArc;

/// Register all project-specific modules with the registry
pub fn register_all(registry: &mut ModuleRegistry, books: BookRepositoryArc) {
    registry.register_custom(books::create_module(books));
}
