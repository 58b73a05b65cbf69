/*!
 * Synchronization Primitives
 *
 * Exclusive, shared/exclusive, and counting coordination for data shared
 * across threads. Each wrapper heap-pins its raw primitive so blocked
 * waiters stay valid across wrapper moves.
 */

mod mutex;
mod rwlock;
mod semaphore;

pub use mutex::Mutex;
pub use rwlock::RwLock;
pub use semaphore::Semaphore;
