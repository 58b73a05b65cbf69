/*!
 * Execution-Context Local Storage
 *
 * One pointer-sized value per execution context: `Tls` per OS thread over
 * native storage keys, `Fls` per fiber over the fiber runtime's tables.
 * Slots are process-wide resources and must outlive every context that
 * reads or writes them.
 */

mod fls;
mod tls;

pub use fls::Fls;
pub use tls::Tls;
