/*!
 * Protocol layer: what Seq expects on the wire.
 *
 * - `constants`: ingestion path, media type, header names, CLEF keys
 * - `endpoint`: immutable transport configuration (URL + headers)
 * - `response`: best-effort parsing of Seq error responses
 */

pub mod constants;
pub mod endpoint;
pub mod response;
