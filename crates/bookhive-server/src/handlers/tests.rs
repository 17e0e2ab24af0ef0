//! Tests for the service handlers against the in-memory store.

use super::*;
use bookhive_domain::{Account, BookStatus, DomainError, OrderStatus, Principal, Role};
use bookhive_storage::{DataStore, MemoryDataStore};
use std::sync::Arc;

use crate::auth::{PasswordHasher, TokenIssuer};

// ============================================================
// Test Fixtures
// ============================================================

struct Fixture {
    store: Arc<MemoryDataStore>,
    accounts: Arc<AccountHandler<MemoryDataStore>>,
    cart: Arc<CartHandler<MemoryDataStore>>,
    catalog: Arc<CatalogHandler<MemoryDataStore>>,
    orders: OrderHandler<MemoryDataStore>,
    proposals: ProposalHandler<MemoryDataStore>,
    publisher: Arc<PublisherHandler<MemoryDataStore>>,
}

fn fixture() -> Fixture {
    let store = MemoryDataStore::new_shared();
    let locks = Arc::new(AccountLocks::new());
    let tokens = TokenIssuer::new(b"handler-tests", 3600).unwrap();
    Fixture {
        accounts: Arc::new(AccountHandler::new(
            Arc::clone(&store),
            Arc::clone(&locks),
            PasswordHasher::new(4),
            tokens,
        )),
        cart: Arc::new(CartHandler::new(Arc::clone(&store), Arc::clone(&locks))),
        catalog: Arc::new(CatalogHandler::new(Arc::clone(&store), Arc::clone(&locks))),
        orders: OrderHandler::new(Arc::clone(&store), Arc::clone(&locks)),
        proposals: ProposalHandler::new(Arc::clone(&store)),
        publisher: Arc::new(PublisherHandler::new(Arc::clone(&store), Arc::clone(&locks))),
        store,
    }
}

async fn principal(fx: &Fixture, name: &str, email: &str, role: Role) -> Principal {
    let account = fx
        .store
        .create_account(Account::new(name, email, "unused-hash", role))
        .await
        .unwrap();
    Principal::from(&account)
}

fn new_book(title: &str, author: &str, price: f64) -> NewBook {
    NewBook {
        title: Some(title.to_string()),
        author: Some(author.to_string()),
        price: Some(price),
        ..Default::default()
    }
}

fn domain_err<T: std::fmt::Debug>(result: ServiceResult<T>) -> DomainError {
    match result {
        Err(ServiceError::Domain(err)) => err,
        other => panic!("expected a domain error, got {other:?}"),
    }
}

// ============================================================
// Section 1: Identity
// ============================================================

#[tokio::test]
async fn test_signup_defaults_to_user_and_rejects_duplicate_email() {
    let fx = fixture();
    let request = SignupRequest {
        name: Some("Reader".into()),
        email: Some("Reader@Example.com".into()),
        password: Some("secret".into()),
        role: None,
    };

    let session = fx.accounts.signup(request.clone()).await.unwrap();
    assert_eq!(session.user.role, Role::User);
    assert_eq!(session.user.email, "reader@example.com");

    let err = domain_err(fx.accounts.signup(request).await);
    assert_eq!(err, DomainError::validation("User already exists"));
}

#[tokio::test]
async fn test_signup_accepts_role_case_insensitively() {
    let fx = fixture();
    let session = fx
        .accounts
        .signup(SignupRequest {
            name: Some("Ann".into()),
            email: Some("ann@example.com".into()),
            password: Some("pw".into()),
            role: Some("Author".into()),
        })
        .await
        .unwrap();
    assert_eq!(session.user.role, Role::Author);
}

#[tokio::test]
async fn test_login_does_not_reveal_which_credential_was_wrong() {
    // Arrange
    let fx = fixture();
    fx.accounts
        .signup(SignupRequest {
            name: Some("Reader".into()),
            email: Some("reader@example.com".into()),
            password: Some("right".into()),
            role: None,
        })
        .await
        .unwrap();

    // Act
    let wrong_password = domain_err(
        fx.accounts
            .login(Credentials {
                email: Some("reader@example.com".into()),
                password: Some("wrong".into()),
            })
            .await,
    );
    let wrong_email = domain_err(
        fx.accounts
            .login(Credentials {
                email: Some("nobody@example.com".into()),
                password: Some("right".into()),
            })
            .await,
    );

    // Assert
    assert_eq!(wrong_password, wrong_email);
    assert_eq!(wrong_password, DomainError::validation("Invalid email or password"));
    assert!(fx
        .accounts
        .login(Credentials {
            email: Some("READER@example.com".into()),
            password: Some("right".into()),
        })
        .await
        .is_ok());
}

#[tokio::test]
async fn test_author_login_only_matches_authors() {
    let fx = fixture();
    fx.accounts
        .signup(SignupRequest {
            name: Some("Reader".into()),
            email: Some("reader@example.com".into()),
            password: Some("pw".into()),
            role: None,
        })
        .await
        .unwrap();

    let err = domain_err(
        fx.accounts
            .login_author(Credentials {
                email: Some("reader@example.com".into()),
                password: Some("pw".into()),
            })
            .await,
    );
    assert!(matches!(err, DomainError::NotFound { .. }));

    let session = fx
        .accounts
        .register_author(SignupRequest {
            name: Some("Writer".into()),
            email: Some("writer@example.com".into()),
            password: Some("pw".into()),
            role: Some("admin".into()),
        })
        .await
        .unwrap();
    assert_eq!(session.user.role, Role::Author);
}

#[tokio::test]
async fn test_set_role_rejects_unknown_role() {
    let fx = fixture();
    let user = principal(&fx, "U", "u@example.com", Role::User).await;

    let err = domain_err(fx.accounts.set_role(&user.id, "superuser").await);
    assert!(matches!(err, DomainError::Validation { .. }));

    let updated = fx.accounts.set_role(&user.id, "PUBLISHER").await.unwrap();
    assert_eq!(updated.role, Role::Publisher);
}

#[tokio::test]
async fn test_bootstrap_admin_is_idempotent() {
    let fx = fixture();
    assert!(fx
        .accounts
        .bootstrap_admin("Root", "root@example.com", "pw")
        .await
        .unwrap());
    assert!(!fx
        .accounts
        .bootstrap_admin("Root", "root@example.com", "pw")
        .await
        .unwrap());
}

// ============================================================
// Section 2: Cart, Wishlist, Addresses
// ============================================================

#[tokio::test]
async fn test_adding_same_book_twice_merges_lines() {
    let fx = fixture();
    let admin = principal(&fx, "Admin", "admin@example.com", Role::Admin).await;
    let user = principal(&fx, "U", "u@example.com", Role::User).await;
    let book = fx.catalog.create_book(&admin, new_book("Dune", "Frank Herbert", 10.0)).await.unwrap();

    for _ in 0..2 {
        fx.cart
            .add_to_cart(
                &user,
                AddToCart {
                    book_id: Some(book.book.id.clone()),
                    quantity: None,
                },
            )
            .await
            .unwrap();
    }

    let cart = fx.cart.cart(&user).await.unwrap();
    assert_eq!(cart.len(), 1);
    assert_eq!(cart[0].quantity, 2);
}

#[tokio::test]
async fn test_add_unknown_book_to_cart_is_not_found() {
    let fx = fixture();
    let user = principal(&fx, "U", "u@example.com", Role::User).await;

    let err = domain_err(
        fx.cart
            .add_to_cart(
                &user,
                AddToCart {
                    book_id: Some("missing".into()),
                    quantity: Some(1),
                },
            )
            .await,
    );
    assert!(matches!(err, DomainError::NotFound { .. }));
}

#[tokio::test]
async fn test_removing_absent_cart_line_succeeds() {
    let fx = fixture();
    let user = principal(&fx, "U", "u@example.com", Role::User).await;

    let account = fx.cart.remove_from_cart(&user, "never-added").await.unwrap();
    assert!(account.cart.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_cart_adds_all_apply() {
    // Arrange
    let fx = fixture();
    let admin = principal(&fx, "Admin", "admin@example.com", Role::Admin).await;
    let user = principal(&fx, "U", "u@example.com", Role::User).await;
    let book = fx.catalog.create_book(&admin, new_book("Dune", "Frank Herbert", 10.0)).await.unwrap();

    // Act
    let mut tasks = Vec::new();
    for _ in 0..20 {
        let cart = Arc::clone(&fx.cart);
        let user = user.clone();
        let book_id = book.book.id.clone();
        tasks.push(tokio::spawn(async move {
            cart.add_to_cart(
                &user,
                AddToCart {
                    book_id: Some(book_id),
                    quantity: Some(1),
                },
            )
            .await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    // Assert
    let account = fx.store.find_account(&user.id).await.unwrap().unwrap();
    assert_eq!(account.cart.len(), 1);
    assert_eq!(account.cart[0].quantity, 20);
}

// Test: a role change racing cart edits on the same account survives
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_role_change_survives_concurrent_cart_edits() {
    let fx = fixture();
    let admin = principal(&fx, "Admin", "admin@example.com", Role::Admin).await;
    let book = fx.catalog.create_book(&admin, new_book("Dune", "F", 1.0)).await.unwrap();

    for round in 0..100 {
        // Arrange
        let user = principal(&fx, "U", &format!("u{round}@example.com"), Role::User).await;

        // Act
        let mut tasks = Vec::new();
        for _ in 0..4 {
            let cart = Arc::clone(&fx.cart);
            let user = user.clone();
            let book_id = book.book.id.clone();
            tasks.push(tokio::spawn(async move {
                for _ in 0..5 {
                    cart.add_to_cart(
                        &user,
                        AddToCart {
                            book_id: Some(book_id.clone()),
                            quantity: Some(1),
                        },
                    )
                    .await
                    .unwrap();
                }
            }));
        }
        let accounts = Arc::clone(&fx.accounts);
        let user_id = user.id.clone();
        let promote = tokio::spawn(async move { accounts.set_role(&user_id, "publisher").await });
        for task in tasks {
            task.await.unwrap();
        }
        promote.await.unwrap().unwrap();

        // Assert
        let stored = fx.store.find_account(&user.id).await.unwrap().unwrap();
        assert_eq!(stored.role, Role::Publisher, "round {round}");
        assert_eq!(stored.cart[0].quantity, 20, "round {round}");
    }
}

#[tokio::test]
async fn test_cart_read_prunes_deleted_books_and_persists() {
    // Arrange: delete the book behind the store's back so no cascade runs
    let fx = fixture();
    let admin = principal(&fx, "Admin", "admin@example.com", Role::Admin).await;
    let user = principal(&fx, "U", "u@example.com", Role::User).await;
    let kept = fx.catalog.create_book(&admin, new_book("Kept", "A", 1.0)).await.unwrap();
    let gone = fx.catalog.create_book(&admin, new_book("Gone", "B", 2.0)).await.unwrap();
    for id in [&kept.book.id, &gone.book.id] {
        fx.cart
            .add_to_cart(
                &user,
                AddToCart {
                    book_id: Some(id.clone()),
                    quantity: Some(1),
                },
            )
            .await
            .unwrap();
    }
    fx.store.delete_book(&gone.book.id).await.unwrap();

    // Act
    let cart = fx.cart.cart(&user).await.unwrap();

    // Assert
    assert_eq!(cart.len(), 1);
    assert_eq!(cart[0].book.book.title, "Kept");
    let stored = fx.store.find_account(&user.id).await.unwrap().unwrap();
    assert_eq!(stored.cart.len(), 1);
}

#[tokio::test]
async fn test_wishlist_add_is_idempotent() {
    let fx = fixture();
    let admin = principal(&fx, "Admin", "admin@example.com", Role::Admin).await;
    let user = principal(&fx, "U", "u@example.com", Role::User).await;
    let book = fx.catalog.create_book(&admin, new_book("Dune", "F", 1.0)).await.unwrap();

    fx.cart.add_to_wishlist(&user, &book.book.id).await.unwrap();
    let account = fx.cart.add_to_wishlist(&user, &book.book.id).await.unwrap();
    assert_eq!(account.wishlist, vec![book.book.id.clone()]);

    fx.cart.remove_from_wishlist(&user, &book.book.id).await.unwrap();
    let account = fx.cart.remove_from_wishlist(&user, &book.book.id).await.unwrap();
    assert!(account.wishlist.is_empty());
}

#[tokio::test]
async fn test_address_default_follows_deletes_and_explicit_choice() {
    let fx = fixture();
    let user = principal(&fx, "U", "u@example.com", Role::User).await;

    let addresses = fx.cart.add_address(&user, "1 Main St").await.unwrap();
    assert!(addresses[0].is_default);
    let addresses = fx.cart.add_address(&user, "2 Side St").await.unwrap();
    let second = addresses[1].id.clone();
    assert!(!addresses[1].is_default);

    let addresses = fx.cart.set_default_address(&user, &second).await.unwrap();
    assert_eq!(addresses.iter().filter(|a| a.is_default).count(), 1);
    assert!(addresses[1].is_default);

    let addresses = fx.cart.delete_address(&user, &second).await.unwrap();
    assert_eq!(addresses.len(), 1);
    assert!(addresses[0].is_default);

    let err = domain_err(fx.cart.delete_address(&user, &second).await);
    assert!(matches!(err, DomainError::NotFound { .. }));
}

// ============================================================
// Section 3: Catalog and Ownership
// ============================================================

#[tokio::test]
async fn test_create_book_without_title_persists_nothing() {
    let fx = fixture();
    let author = principal(&fx, "Ann", "ann@example.com", Role::Author).await;

    let err = domain_err(
        fx.catalog
            .create_authored_book(
                &author,
                NewBook {
                    price: Some(5.0),
                    ..Default::default()
                },
            )
            .await,
    );

    assert_eq!(err, DomainError::missing_field("title"));
    assert!(fx.catalog.admin_list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_negative_price_is_rejected() {
    let fx = fixture();
    let admin = principal(&fx, "Admin", "admin@example.com", Role::Admin).await;

    let err = domain_err(fx.catalog.create_book(&admin, new_book("T", "A", -1.0)).await);
    assert!(matches!(err, DomainError::Validation { .. }));
}

#[tokio::test]
async fn test_authored_book_shows_in_my_books_with_back_reference() {
    let fx = fixture();
    let author = principal(&fx, "Ann", "ann@example.com", Role::Author).await;

    let created = fx
        .catalog
        .create_authored_book(&author, new_book("Mine", "ignored", 12.5))
        .await
        .unwrap();

    let mine = fx.catalog.my_books(&author).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].book.id, created.book.id);
    assert_eq!(mine[0].rating.num_reviews, 0);

    let account = fx.store.find_account(&author.id).await.unwrap().unwrap();
    assert_eq!(account.books, vec![created.book.id.clone()]);
}

#[tokio::test]
async fn test_author_given_as_account_id_is_stored_as_reference() {
    let fx = fixture();
    let admin = principal(&fx, "Admin", "admin@example.com", Role::Admin).await;
    let author = principal(&fx, "Ann", "ann@example.com", Role::Author).await;

    let created = fx
        .catalog
        .create_book(&admin, new_book("Ref", &author.id, 3.0))
        .await
        .unwrap();

    assert_eq!(created.book.author.account_id(), Some(author.id.as_str()));
    let by_author = fx.catalog.books_by_author(&author.id).await.unwrap();
    assert_eq!(by_author.len(), 1);
}

#[tokio::test]
async fn test_books_by_author_without_books_is_not_found() {
    let fx = fixture();
    let err = domain_err(fx.catalog.books_by_author("nobody").await);
    assert!(matches!(err, DomainError::NotFound { .. }));
}

#[tokio::test]
async fn test_name_and_reference_owners_may_delete() {
    // Arrange
    let fx = fixture();
    let admin = principal(&fx, "Admin", "admin@example.com", Role::Admin).await;
    let author = principal(&fx, "Mary Shelley", "mary@example.com", Role::Author).await;
    let reader = principal(&fx, "Reader", "reader@example.com", Role::User).await;
    let by_name = fx
        .catalog
        .create_book(&admin, new_book("Frankenstein", "mary shelley", 5.0))
        .await
        .unwrap();
    let by_ref = fx
        .catalog
        .create_authored_book(&author, new_book("The Last Man", "", 6.0))
        .await
        .unwrap();

    // Act / Assert
    let err = domain_err(fx.catalog.delete_book(&reader, &by_name.book.id).await);
    assert!(matches!(err, DomainError::Forbidden { .. }));
    assert!(fx.catalog.delete_book(&author, &by_name.book.id).await.is_ok());
    assert!(fx.catalog.delete_book(&author, &by_ref.book.id).await.is_ok());
}

#[tokio::test]
async fn test_forbidden_update_leaves_book_unchanged() {
    let fx = fixture();
    let author = principal(&fx, "Ann", "ann@example.com", Role::Author).await;
    let other = principal(&fx, "Bob", "bob@example.com", Role::Author).await;
    let book = fx
        .catalog
        .create_authored_book(&author, new_book("Mine", "", 10.0))
        .await
        .unwrap();

    let update = BookUpdate {
        price: Some(1.0),
        ..Default::default()
    };
    let err = domain_err(fx.catalog.update_book(&other, &book.book.id, update.clone()).await);
    assert!(matches!(err, DomainError::Forbidden { .. }));
    assert_eq!(fx.catalog.get_book(&book.book.id).await.unwrap().book.price, 10.0);

    let updated = fx.catalog.update_book(&author, &book.book.id, update).await.unwrap();
    assert_eq!(updated.book.price, 1.0);
}

#[tokio::test]
async fn test_delete_book_cascades_to_carts_and_wishlists() {
    let fx = fixture();
    let admin = principal(&fx, "Admin", "admin@example.com", Role::Admin).await;
    let user = principal(&fx, "U", "u@example.com", Role::User).await;
    let book = fx.catalog.create_book(&admin, new_book("Dune", "F", 1.0)).await.unwrap();
    fx.cart
        .add_to_cart(
            &user,
            AddToCart {
                book_id: Some(book.book.id.clone()),
                quantity: Some(3),
            },
        )
        .await
        .unwrap();
    fx.cart.add_to_wishlist(&user, &book.book.id).await.unwrap();

    fx.catalog.admin_delete(&book.book.id).await.unwrap();

    let account = fx.store.find_account(&user.id).await.unwrap().unwrap();
    assert!(account.cart.is_empty());
    assert!(account.wishlist.is_empty());
}

#[tokio::test]
async fn test_moderation_hides_rejected_books_from_public_list() {
    let fx = fixture();
    let admin = principal(&fx, "Admin", "admin@example.com", Role::Admin).await;
    let book = fx.catalog.create_book(&admin, new_book("Dune", "F", 1.0)).await.unwrap();
    assert_eq!(fx.catalog.list_approved().await.unwrap().len(), 1);

    let moderated = fx.catalog.moderate(&book.book.id, BookStatus::Rejected).await.unwrap();
    assert_eq!(moderated.book.status, BookStatus::Rejected);
    assert!(fx.catalog.list_approved().await.unwrap().is_empty());
    assert_eq!(fx.catalog.get_book(&book.book.id).await.unwrap().book.status, BookStatus::Rejected);
}

#[tokio::test]
async fn test_duplicate_review_conflicts_and_keeps_count() {
    let fx = fixture();
    let admin = principal(&fx, "Admin", "admin@example.com", Role::Admin).await;
    let reader = principal(&fx, "Reader", "reader@example.com", Role::User).await;
    let book = fx.catalog.create_book(&admin, new_book("Dune", "F", 1.0)).await.unwrap();

    let view = fx
        .catalog
        .add_review(&reader, &book.book.id, Some(4), Some("Great"))
        .await
        .unwrap();
    assert_eq!(view.rating.num_reviews, 1);

    let err = domain_err(
        fx.catalog
            .add_review(&reader, &book.book.id, Some(5), Some("Again"))
            .await,
    );
    assert_eq!(err, DomainError::conflict("Book already reviewed"));
    assert_eq!(fx.catalog.get_book(&book.book.id).await.unwrap().rating.num_reviews, 1);
}

// Test: moderation and repricing racing new reviews are never undone
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_book_patches_survive_concurrent_reviews() {
    let fx = fixture();
    let publisher = principal(&fx, "House", "house@example.com", Role::Publisher).await;

    for round in 0..100 {
        // Arrange
        let mut request = new_book(&format!("Book {round}"), "A", 5.0);
        request.publisher_id = Some(publisher.id.clone());
        let book_id = fx.catalog.create_book(&publisher, request).await.unwrap().book.id;

        // Act
        let mut tasks = Vec::new();
        for reader in 0..10 {
            let catalog = Arc::clone(&fx.catalog);
            let book_id = book_id.clone();
            let reader = Principal::new(format!("reader-{reader}"), "Reader", Role::User);
            tasks.push(tokio::spawn(async move {
                catalog
                    .add_review(&reader, &book_id, Some(4), Some("Solid"))
                    .await
                    .map(|_| ())
            }));
        }
        let catalog = Arc::clone(&fx.catalog);
        let moderated_id = book_id.clone();
        let reject =
            tokio::spawn(async move { catalog.moderate(&moderated_id, BookStatus::Rejected).await });
        let publisher_handler = Arc::clone(&fx.publisher);
        let owner = publisher.clone();
        let priced_id = book_id.clone();
        let reprice = tokio::spawn(async move {
            publisher_handler.update_price(&owner, &priced_id, Some(9.5)).await
        });
        for task in tasks {
            task.await.unwrap().unwrap();
        }
        reject.await.unwrap().unwrap();
        reprice.await.unwrap().unwrap();

        // Assert
        let stored = fx.store.find_book(&book_id).await.unwrap().unwrap();
        assert_eq!(stored.status, BookStatus::Rejected, "round {round}");
        assert_eq!(stored.price, 9.5, "round {round}");
        assert_eq!(stored.reviews.len(), 10, "round {round}");
    }
}

#[tokio::test]
async fn test_only_reviewer_or_admin_removes_review() {
    let fx = fixture();
    let admin = principal(&fx, "Admin", "admin@example.com", Role::Admin).await;
    let reader = principal(&fx, "Reader", "reader@example.com", Role::User).await;
    let other = principal(&fx, "Other", "other@example.com", Role::User).await;
    let book = fx.catalog.create_book(&admin, new_book("Dune", "F", 1.0)).await.unwrap();
    let view = fx
        .catalog
        .add_review(&reader, &book.book.id, Some(3), Some("Fine"))
        .await
        .unwrap();
    let review_id = view.book.reviews[0].id.clone();

    let err = domain_err(fx.catalog.delete_review(&other, &book.book.id, &review_id).await);
    assert!(matches!(err, DomainError::Forbidden { .. }));

    fx.catalog.delete_review(&admin, &book.book.id, &review_id).await.unwrap();
    assert_eq!(fx.catalog.get_book(&book.book.id).await.unwrap().rating.num_reviews, 0);
}

// ============================================================
// Section 4: Orders
// ============================================================

fn checkout() -> PlaceOrder {
    PlaceOrder {
        items: None,
        address: Some("1 Main St".into()),
        contact_number: Some("555-0100".into()),
        payment_method: Some("Cash On Delivery".into()),
    }
}

#[tokio::test]
async fn test_order_from_cart_snapshots_items_and_clears_cart() {
    // Arrange
    let fx = fixture();
    let admin = principal(&fx, "Admin", "admin@example.com", Role::Admin).await;
    let user = principal(&fx, "U", "u@example.com", Role::User).await;
    let first = fx.catalog.create_book(&admin, new_book("One", "A", 10.0)).await.unwrap();
    let second = fx.catalog.create_book(&admin, new_book("Two", "B", 2.5)).await.unwrap();
    for (id, quantity) in [(&first.book.id, 1), (&second.book.id, 2)] {
        fx.cart
            .add_to_cart(
                &user,
                AddToCart {
                    book_id: Some(id.clone()),
                    quantity: Some(quantity),
                },
            )
            .await
            .unwrap();
    }

    // Act
    let order = fx.orders.place_order(&user, checkout()).await.unwrap();
    fx.catalog
        .admin_update(
            &first.book.id,
            BookUpdate {
                price: Some(99.0),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    // Assert
    assert_eq!(order.items.len(), 2);
    assert_eq!(order.items[0].title, "One");
    assert_eq!(order.total_amount, 15.0);
    assert!(fx.cart.cart(&user).await.unwrap().is_empty());
    let history = fx.orders.my_orders(&user).await.unwrap();
    assert_eq!(history[0].items[0].price, 10.0);
}

#[tokio::test]
async fn test_empty_cart_cannot_be_ordered() {
    let fx = fixture();
    let user = principal(&fx, "U", "u@example.com", Role::User).await;

    let err = domain_err(fx.orders.place_order(&user, checkout()).await);
    assert_eq!(err, DomainError::validation("Cart is empty"));
    assert!(fx.orders.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_payment_method_is_rejected() {
    let fx = fixture();
    let user = principal(&fx, "U", "u@example.com", Role::User).await;
    let mut request = checkout();
    request.payment_method = Some("barter".into());

    let err = domain_err(fx.orders.place_order(&user, request).await);
    assert!(matches!(err, DomainError::Validation { .. }));
}

#[tokio::test]
async fn test_admin_updates_status_and_sees_analytics() {
    let fx = fixture();
    let admin = principal(&fx, "Admin", "admin@example.com", Role::Admin).await;
    let user = principal(&fx, "U", "u@example.com", Role::User).await;
    let mut request = new_book("One", "A", 4.0);
    request.category = Some("Fiction".into());
    let book = fx.catalog.create_book(&admin, request).await.unwrap();
    let mut explicit = checkout();
    explicit.items = Some(vec![OrderLine {
        book_id: Some(book.book.id.clone()),
        quantity: Some(3),
    }]);
    let order = fx.orders.place_order(&user, explicit).await.unwrap();

    let updated = fx
        .orders
        .update(
            &order.id,
            OrderUpdate {
                status: Some("shipped".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.status, OrderStatus::Shipped);

    let buckets = fx.orders.analytics().await.unwrap();
    assert_eq!(buckets.len(), 1);
    assert_eq!(buckets[0].category, "Fiction");
    assert_eq!(buckets[0].total_sales, 12.0);
    assert_eq!(buckets[0].units_sold, 3);
}

// ============================================================
// Section 5: Proposals and Publisher Dashboard
// ============================================================

fn pitch(publisher: &str) -> NewProposal {
    NewProposal {
        title: Some("Pitch".into()),
        content: Some("A story".into()),
        publisher: Some(publisher.into()),
        category: None,
    }
}

#[tokio::test]
async fn test_proposal_publisher_must_resolve_to_one_account() {
    let fx = fixture();
    let author = principal(&fx, "Ann", "ann@example.com", Role::Author).await;
    principal(&fx, "Twin House", "t1@example.com", Role::Publisher).await;
    principal(&fx, "twin house", "t2@example.com", Role::Publisher).await;

    let err = domain_err(fx.proposals.submit(&author, pitch("Nobody Press")).await);
    assert!(matches!(err, DomainError::NotFound { .. }));

    let err = domain_err(fx.proposals.submit(&author, pitch("Twin House")).await);
    assert!(matches!(err, DomainError::Validation { .. }));
}

#[tokio::test]
async fn test_renamed_publisher_keeps_proposals() {
    // Arrange
    let fx = fixture();
    let author = principal(&fx, "Ann", "ann@example.com", Role::Author).await;
    let publisher = principal(&fx, "Old House", "house@example.com", Role::Publisher).await;
    let proposal = fx.proposals.submit(&author, pitch("old house")).await.unwrap();

    // Act
    fx.publisher
        .update_profile(
            &publisher,
            ProfileUpdate {
                name: Some("New House".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let renamed = Principal::from(&fx.store.find_account(&publisher.id).await.unwrap().unwrap());

    // Assert
    let inbox = fx.proposals.for_publisher(&renamed).await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].publisher_name, "New House");
    let decided = fx
        .proposals
        .set_status(&renamed, &proposal.id, "accepted")
        .await
        .unwrap();
    assert_eq!(decided.status, bookhive_domain::ProposalStatus::Accepted);
}

#[tokio::test]
async fn test_other_publisher_cannot_decide_proposal() {
    let fx = fixture();
    let author = principal(&fx, "Ann", "ann@example.com", Role::Author).await;
    principal(&fx, "House", "house@example.com", Role::Publisher).await;
    let rival = principal(&fx, "Rival", "rival@example.com", Role::Publisher).await;
    let proposal = fx.proposals.submit(&author, pitch("House")).await.unwrap();

    let err = domain_err(fx.proposals.set_status(&rival, &proposal.id, "rejected").await);
    assert!(matches!(err, DomainError::Forbidden { .. }));

    let err = domain_err(fx.proposals.set_status(&rival, &proposal.id, "pending").await);
    assert!(matches!(err, DomainError::Validation { .. }));
}

#[tokio::test]
async fn test_publisher_dashboard_is_scoped_to_own_books() {
    // Arrange
    let fx = fixture();
    let publisher = principal(&fx, "House", "house@example.com", Role::Publisher).await;
    let rival = principal(&fx, "Rival", "rival@example.com", Role::Publisher).await;
    let user = principal(&fx, "U", "u@example.com", Role::User).await;
    let mut request = new_book("Published", "A", 5.0);
    request.publisher_email = Some("HOUSE@example.com".into());
    let book = fx.catalog.create_book(&publisher, request).await.unwrap();
    let mut order = checkout();
    order.items = Some(vec![OrderLine {
        book_id: Some(book.book.id.clone()),
        quantity: Some(4),
    }]);
    fx.orders.place_order(&user, order).await.unwrap();

    // Act / Assert
    assert_eq!(book.book.publisher_name.as_deref(), Some("House"));
    assert_eq!(fx.publisher.books(&publisher).await.unwrap().len(), 1);
    assert!(fx.publisher.books(&rival).await.unwrap().is_empty());

    let err = domain_err(fx.publisher.update_price(&rival, &book.book.id, Some(1.0)).await);
    assert!(matches!(err, DomainError::NotFound { .. }));
    let repriced = fx
        .publisher
        .update_price(&publisher, &book.book.id, Some(7.0))
        .await
        .unwrap();
    assert_eq!(repriced.book.price, 7.0);

    let insights = fx.publisher.insights(&publisher).await.unwrap();
    assert_eq!(insights.publisher_name, "House");
    assert_eq!(insights.sales_by_book[0].sales, 4);
}

// Test: a publisher's delete cascades like any other book delete
#[tokio::test]
async fn test_publisher_delete_scrubs_carts_and_wishlists() {
    let fx = fixture();
    let publisher = principal(&fx, "House", "house@example.com", Role::Publisher).await;
    let user = principal(&fx, "U", "u@example.com", Role::User).await;
    let mut request = new_book("Published", "A", 5.0);
    request.publisher_id = Some(publisher.id.clone());
    let book_id = fx.catalog.create_book(&publisher, request).await.unwrap().book.id;
    fx.cart
        .add_to_cart(
            &user,
            AddToCart {
                book_id: Some(book_id.clone()),
                quantity: Some(2),
            },
        )
        .await
        .unwrap();
    fx.cart.add_to_wishlist(&user, &book_id).await.unwrap();

    fx.publisher.delete_book(&publisher, &book_id).await.unwrap();

    let stored = fx.store.find_account(&user.id).await.unwrap().unwrap();
    assert!(stored.cart.is_empty());
    assert!(stored.wishlist.is_empty());
    let owner = fx.store.find_account(&publisher.id).await.unwrap().unwrap();
    assert!(!owner.books.contains(&book_id));
}

#[test]
fn test_awards_accept_list_or_comma_string() {
    let list: Awards = serde_json::from_str(r#"["Hugo", " Nebula "]"#).unwrap();
    let text: Awards = serde_json::from_str(r#""Hugo, Nebula,""#).unwrap();
    assert_eq!(list.into_vec(), vec!["Hugo", "Nebula"]);
    assert_eq!(text.into_vec(), vec!["Hugo", "Nebula"]);
}

#[tokio::test]
async fn test_me_prunes_dangling_references() {
    let fx = fixture();
    let admin = principal(&fx, "Admin", "admin@example.com", Role::Admin).await;
    let user = principal(&fx, "U", "u@example.com", Role::User).await;
    let book = fx.catalog.create_book(&admin, new_book("Dune", "F", 1.0)).await.unwrap();
    fx.cart.add_to_wishlist(&user, &book.book.id).await.unwrap();
    fx.store.delete_book(&book.book.id).await.unwrap();

    let me = fx.accounts.me(&user).await.unwrap();
    assert!(me.wishlist.is_empty());
    let stored = fx.store.find_account(&user.id).await.unwrap().unwrap();
    assert!(stored.wishlist.is_empty());
}
