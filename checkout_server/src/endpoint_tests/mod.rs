mod checkout;
mod helpers;
mod mocks;
mod verify;
mod webhook;
